//! CIFS credentials files.
//!
//! A missing file is written once with owner-only permissions. An existing
//! file is never rewritten; its owner and mode are only checked.

use crate::constants;
use crate::core::exec::{Action, Executor, FileSpec, Step, StepStatus};
use crate::error::AutomountResult;
use crate::util::fs as auto_fs;
use crate::util::system::Account;
use std::fs;
use std::path::PathBuf;
use zeroize::Zeroizing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub path: PathBuf,
    pub owner: Account,
    pub mode: u32,
}

impl CredentialRecord {
    pub fn new(path: PathBuf, owner: Account) -> Self {
        Self {
            path,
            owner,
            mode: constants::CREDENTIALS_FILE_MODE,
        }
    }

    /// Ownership and mode differences of the file on disk.
    pub fn mismatches(&self) -> Vec<String> {
        let Some((owner, mode)) = auto_fs::owner_and_mode(&self.path) else {
            return vec![format!("cannot stat {}", self.path.display())];
        };
        let mut out = Vec::new();
        if owner != self.owner {
            out.push(format!(
                "owner is {}:{}, expected {}:{}",
                owner.uid, owner.gid, self.owner.uid, self.owner.gid
            ));
        }
        if mode != self.mode {
            out.push(format!("mode is {:04o}, expected {:04o}", mode, self.mode));
        }
        out
    }
}

/// File body: exactly two lines, no trailing newline.
pub fn render(user: &str, password: &str) -> Zeroizing<String> {
    Zeroizing::new(format!("username={user}\npassword={password}"))
}

/// Write the credentials file if absent, otherwise warn about drift.
pub fn ensure(
    exec: &mut Executor<'_>,
    record: &CredentialRecord,
    user: &str,
    password: &str,
) -> AutomountResult<()> {
    if fs::symlink_metadata(&record.path).is_err() {
        return exec.execute(vec![Step::fatal(
            format!("write credentials file {}", record.path.display()),
            Action::WriteFile {
                path: record.path.clone(),
                content: render(user, password),
                spec: FileSpec {
                    mode: record.mode,
                    owner: Some(record.owner),
                },
            },
        )]);
    }

    exec.record(
        format!(
            "credentials file {} exists, content left untouched",
            record.path.display()
        ),
        StepStatus::Info,
        None,
    );
    for mismatch in record.mismatches() {
        exec.record(
            format!("credentials file {}", record.path.display()),
            StepStatus::Warning,
            Some(format!("{mismatch}; fix manually")),
        );
    }
    Ok(())
}
