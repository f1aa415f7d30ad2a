//! Centralized constants for permissions, paths, and mount options.

/// Default systemd unit directory.
pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";

/// Default directory for CIFS credentials files.
pub const DEFAULT_CREDENTIALS_DIR: &str = "/etc/samba";

/// Default directory for per-mountpoint lock files.
pub const DEFAULT_LOCK_DIR: &str = "/run/lock/cifs-automount";

/// Default configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cifs-automount.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "CIFS_AUTOMOUNT_CONFIG";

/// Environment variable supplying the NAS password.
pub const PASSWORD_ENV: &str = "CIFS_AUTOMOUNT_PASSWORD";

/// Default SMB protocol version.
pub const DEFAULT_SMB_VERSION: &str = "3.0";

/// Permission mode for credentials files (owner read/write only).
pub const CREDENTIALS_FILE_MODE: u32 = 0o600;

/// Permission mode for created mountpoint directories.
pub const MOUNTPOINT_DIR_MODE: u32 = 0o755;

/// Permission mode for rendered unit files.
pub const UNIT_FILE_MODE: u32 = 0o644;

/// Filesystem type written to `Type=`.
pub const FS_TYPE: &str = "cifs";

/// Character set passed as `iocharset=`.
pub const IOCHARSET: &str = "utf8";

/// Flags appended after the keyed mount options, in order.
pub const FIXED_MOUNT_FLAGS: &[&str] = &["nofail", "_netdev", "x-systemd.automount"];

/// Install target for both units.
pub const INSTALL_TARGET: &str = "multi-user.target";

/// Prefix of credentials file names.
pub const CREDENTIALS_PREFIX: &str = "credentials.";

/// Suffix of mount unit files.
pub const MOUNT_SUFFIX: &str = ".mount";

/// Suffix of automount unit files.
pub const AUTOMOUNT_SUFFIX: &str = ".automount";
