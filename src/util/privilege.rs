//! Privilege checks for root enforcement.

use crate::error::{AutomountError, AutomountResult};
use crate::util::system::System;

/// Require root for a given action, or fail with a privilege error.
pub fn require_root(system: &dyn System, action: &str) -> AutomountResult<()> {
    if !system.is_root() {
        return Err(AutomountError::Privilege(format!(
            "'{action}' requires root privileges. Run with sudo, or preview with --test."
        )));
    }
    Ok(())
}
