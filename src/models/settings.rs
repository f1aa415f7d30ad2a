//! Configuration file model.

use crate::constants;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub unit_dir: PathBuf,
    pub credentials_dir: PathBuf,
    pub lock_dir: PathBuf,
    /// Used when `--smb-version` is not given.
    pub smb_version: String,
    /// Owner applied to created directories and credentials files.
    pub owner_uid: u32,
    pub owner_gid: u32,
    pub systemctl: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            unit_dir: PathBuf::from(constants::DEFAULT_UNIT_DIR),
            credentials_dir: PathBuf::from(constants::DEFAULT_CREDENTIALS_DIR),
            lock_dir: PathBuf::from(constants::DEFAULT_LOCK_DIR),
            smb_version: constants::DEFAULT_SMB_VERSION.to_string(),
            owner_uid: 0,
            owner_gid: 0,
            systemctl: "systemctl".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str("unit_dir = \"/tmp/units\"\n").unwrap();
        assert_eq!(settings.unit_dir, PathBuf::from("/tmp/units"));
        assert_eq!(settings.credentials_dir, PathBuf::from("/etc/samba"));
        assert_eq!(settings.smb_version, "3.0");
        assert_eq!(settings.owner_uid, 0);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<Settings>("unit_directory = \"/x\"\n").is_err());
    }
}
