//! Utility modules for filesystem, host and systemd operations.

pub mod fs;
pub mod logging;
pub mod privilege;
pub mod system;
pub mod systemd;
