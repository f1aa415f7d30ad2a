//! Unit names derived from mountpoint paths.
//!
//! Follows the `systemd-escape --path` rules:
//!
//! - leading and trailing `/` are dropped, repeated `/` collapse
//! - the remaining `/` become `-`
//! - bytes outside `[a-zA-Z0-9:_.]` (including a literal `-`) become `\xHH`
//! - a leading `.` is escaped as `\x2e`
//! - the root path becomes `-`
//!
//! Every byte is either kept or escaped unambiguously, so
//! [`unescape_path`] recovers the normalized path exactly.

use crate::constants;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

fn is_valid_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b':' || b == b'_' || b == b'.'
}

/// Escape an absolute path into a unit name component.
pub fn escape_path(path: &Path) -> String {
    let segments: Vec<&[u8]> = path
        .as_os_str()
        .as_bytes()
        .split(|b| *b == b'/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return "-".to_string();
    }

    let mut out = String::new();
    for (seg_idx, segment) in segments.iter().enumerate() {
        if seg_idx > 0 {
            out.push('-');
        }
        for (i, &b) in segment.iter().enumerate() {
            let leading_dot = seg_idx == 0 && i == 0 && b == b'.';
            if is_valid_byte(b) && !leading_dot {
                out.push(char::from(b));
            } else {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out
}

/// Reverse [`escape_path`]. `None` on malformed escapes.
pub fn unescape_path(name: &str) -> Option<PathBuf> {
    if name == "-" {
        return Some(PathBuf::from("/"));
    }
    let bytes = name.as_bytes();
    let mut out = vec![b'/'];
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'-' => {
                out.push(b'/');
                i += 1;
            }
            b'\\' => {
                if bytes.get(i + 1) != Some(&b'x') {
                    return None;
                }
                let hi = hex_digit(*bytes.get(i + 2)?)?;
                let lo = hex_digit(*bytes.get(i + 3)?)?;
                out.push(hi << 4 | lo);
                i += 4;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Some(PathBuf::from(OsString::from_vec(out)))
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// The mount/automount unit names and file paths for one mountpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitNamePair {
    pub base: String,
    pub mount_unit: String,
    pub automount_unit: String,
    pub mount_path: PathBuf,
    pub automount_path: PathBuf,
}

impl UnitNamePair {
    pub fn derive(unit_dir: &Path, mountpoint: &Path) -> Self {
        let base = escape_path(mountpoint);
        let mount_unit = format!("{base}{}", constants::MOUNT_SUFFIX);
        let automount_unit = format!("{base}{}", constants::AUTOMOUNT_SUFFIX);
        Self {
            mount_path: unit_dir.join(&mount_unit),
            automount_path: unit_dir.join(&automount_unit),
            base,
            mount_unit,
            automount_unit,
        }
    }
}
