//! Read-only listing of the CIFS mounts provisioned in the unit directory.

use crate::constants;
use crate::core::unit_file::UnitFile;
use crate::core::unit_name;
use crate::error::{AutomountError, AutomountResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct ManagedMount {
    pub unit: String,
    /// Mountpoint decoded from the unit name.
    pub mountpoint: Option<PathBuf>,
    pub what: String,
    #[serde(rename = "where")]
    pub where_: String,
    pub automount: bool,
}

/// Every `*.mount` in `unit_dir` with `Type=cifs`, sorted by unit name.
pub fn list(unit_dir: &Path) -> AutomountResult<Vec<ManagedMount>> {
    let pattern = format!(
        "{}/*{}",
        glob::Pattern::escape(&unit_dir.to_string_lossy()),
        constants::MOUNT_SUFFIX
    );
    let entries = glob::glob(&pattern).map_err(|err| AutomountError::Config {
        path: unit_dir.to_path_buf(),
        detail: format!("invalid unit directory pattern: {err}"),
    })?;

    let mut mounts = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                debug!(error = %err, "skipping unreadable unit");
                continue;
            }
        };
        if let Some(mount) = inspect(&path) {
            mounts.push(mount);
        }
    }
    mounts.sort_by(|a, b| a.unit.cmp(&b.unit));
    Ok(mounts)
}

/// `None` for anything that is not a readable cifs mount unit.
fn inspect(path: &Path) -> Option<ManagedMount> {
    let unit = path.file_name().and_then(|n| n.to_str())?;
    let base = unit.strip_suffix(constants::MOUNT_SUFFIX)?;
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "skipping unreadable unit");
            return None;
        }
    };
    let parsed = UnitFile::parse(&content);
    if parsed.get("Mount", "Type") != Some(constants::FS_TYPE) {
        return None;
    }
    let automount = path.with_file_name(format!("{base}{}", constants::AUTOMOUNT_SUFFIX));
    Some(ManagedMount {
        unit: unit.to_string(),
        mountpoint: unit_name::unescape_path(base),
        what: parsed.get("Mount", "What").unwrap_or_default().to_string(),
        where_: parsed.get("Mount", "Where").unwrap_or_default().to_string(),
        automount: automount.exists(),
    })
}
