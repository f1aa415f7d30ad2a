//! Immutable request values built once argument parsing completes.

use crate::error::{AutomountError, AutomountResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use zeroize::Zeroizing;

/// Server and share parsed from `//host/share[/sub...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub host: String,
    /// Share path including its leading `/`.
    pub share: String,
}

impl FromStr for ServerSpec {
    type Err = AutomountError;

    fn from_str(s: &str) -> AutomountResult<Self> {
        let rest = s.strip_prefix("//").ok_or_else(|| {
            AutomountError::Usage(format!("server spec '{s}' must look like //host/share"))
        })?;
        let (host, share) = rest.split_once('/').ok_or_else(|| {
            AutomountError::Usage(format!("server spec '{s}' is missing the share name"))
        })?;
        let share = share.trim_end_matches('/');
        if !is_valid_host(host) {
            return Err(AutomountError::Usage(format!(
                "server spec '{}' has an invalid host",
                s.escape_debug()
            )));
        }
        if share.is_empty() || share.starts_with('/') {
            return Err(AutomountError::Usage(format!(
                "server spec '{s}' has an empty share name"
            )));
        }
        if share.chars().any(char::is_control) {
            return Err(AutomountError::Usage(format!(
                "server spec '{}' contains control characters",
                s.escape_debug()
            )));
        }
        Ok(Self {
            host: host.to_string(),
            share: format!("/{share}"),
        })
    }
}

/// Host name, IPv4 or IPv6 address; a bracketed IPv6 literal is accepted.
/// The host ends up inside `Options=` via the credentials path, so
/// separators such as `,` and `=` are never allowed.
fn is_valid_host(host: &str) -> bool {
    let inner = match host.strip_prefix('[') {
        Some(rest) => match rest.strip_suffix(']') {
            Some(inner) => inner,
            None => return false,
        },
        None => host,
    };
    !inner.is_empty()
        && inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
}

impl fmt::Display for ServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}{}", self.host, self.share)
    }
}

#[derive(Debug)]
pub struct MountRequest {
    pub server: ServerSpec,
    pub mountpoint: PathBuf,
    pub username: String,
    pub password: Zeroizing<String>,
    pub smb_version: String,
    pub dry_run: bool,
}

impl MountRequest {
    pub fn new(
        server: &str,
        mountpoint: &str,
        username: &str,
        password: Zeroizing<String>,
        smb_version: &str,
        dry_run: bool,
    ) -> AutomountResult<Self> {
        let (server, mountpoint) = Self::check_args(server, mountpoint, username, smb_version)?;
        if password.is_empty() {
            return Err(AutomountError::Usage("--password must not be empty".into()));
        }
        if password.contains(['\n', '\r']) {
            return Err(AutomountError::Usage(
                "password must not contain a line break".into(),
            ));
        }
        Ok(Self {
            server,
            mountpoint,
            username: username.to_string(),
            password,
            smb_version: smb_version.to_string(),
            dry_run,
        })
    }

    /// Everything but the password, so a prompt only follows valid input.
    pub fn check_args(
        server: &str,
        mountpoint: &str,
        username: &str,
        smb_version: &str,
    ) -> AutomountResult<(ServerSpec, PathBuf)> {
        let server: ServerSpec = server.parse()?;
        let mountpoint = normalize_mountpoint(mountpoint)?;
        if username.is_empty() {
            return Err(AutomountError::Usage("--user must not be empty".into()));
        }
        if username
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | ',' | '='))
        {
            return Err(AutomountError::Usage(format!(
                "user name '{}' contains invalid characters",
                username.escape_debug()
            )));
        }
        validate_smb_version(smb_version)?;
        Ok((server, mountpoint))
    }
}

#[derive(Debug, Clone)]
pub struct UnmountRequest {
    pub mountpoint: PathBuf,
    pub dry_run: bool,
}

impl UnmountRequest {
    pub fn new(mountpoint: &str, dry_run: bool) -> AutomountResult<Self> {
        Ok(Self {
            mountpoint: normalize_mountpoint(mountpoint)?,
            dry_run,
        })
    }
}

/// Canonical absolute mountpoint: duplicate and trailing slashes collapse,
/// `.`/`..` components and the root itself are rejected.
pub fn normalize_mountpoint(raw: &str) -> AutomountResult<PathBuf> {
    if !raw.starts_with('/') {
        return Err(AutomountError::Usage(format!(
            "mountpoint '{raw}' must be an absolute path"
        )));
    }
    if raw.chars().any(char::is_control) {
        return Err(AutomountError::Usage(format!(
            "mountpoint '{}' contains control characters",
            raw.escape_debug()
        )));
    }
    let mut parts = Vec::new();
    for part in raw.split('/').filter(|p| !p.is_empty()) {
        if part == "." || part == ".." {
            return Err(AutomountError::Usage(format!(
                "mountpoint '{raw}' must not contain '.' or '..' components"
            )));
        }
        parts.push(part);
    }
    if parts.is_empty() {
        return Err(AutomountError::Usage(
            "refusing to use / as a mountpoint".into(),
        ));
    }
    Ok(Path::new("/").join(parts.join("/")))
}

/// Accepts dotted numeric versions such as `1.0`, `3` or `3.1.1`.
pub fn validate_smb_version(version: &str) -> AutomountResult<()> {
    let valid = !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if valid {
        Ok(())
    } else {
        Err(AutomountError::Usage(format!(
            "invalid SMB version '{version}' (expected e.g. 2.1, 3.0, 3.1.1)"
        )))
    }
}
