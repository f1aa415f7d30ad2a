//! File-based locking using flock(2) so two runs cannot work on one mountpoint.

use crate::core::exec::Mode;
use crate::error::{AutomountError, AutomountResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tracing::debug;

/// An exclusive file lock. Released on drop (file close releases flock).
pub struct FileLock {
    _file: File,
}

impl FileLock {
    /// Non-blocking; `Ok(None)` when another process holds it.
    pub fn try_exclusive(path: &Path) -> AutomountResult<Option<Self>> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|err| AutomountError::io(format!("open lock file {}", path.display()), err))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { _file: file })),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            // fs2 on Linux may return Other instead of WouldBlock
            Err(ref e) if e.raw_os_error() == Some(11) => Ok(None), // EAGAIN
            Err(e) => Err(AutomountError::io(format!("try lock {}", path.display()), e)),
        }
    }
}

/// Take the per-mountpoint lock for a live run. Dry runs take none.
pub fn lock_mountpoint(
    lock_dir: &Path,
    base_name: &str,
    mountpoint: &Path,
    mode: Mode,
) -> AutomountResult<Option<FileLock>> {
    if mode == Mode::DryRun {
        return Ok(None);
    }
    fs::create_dir_all(lock_dir)
        .map_err(|err| AutomountError::io(format!("create {}", lock_dir.display()), err))?;
    let path = lock_dir.join(format!("{base_name}.lock"));
    match FileLock::try_exclusive(&path)? {
        Some(lock) => {
            debug!(lock = %path.display(), "acquired");
            Ok(Some(lock))
        }
        None => Err(AutomountError::Precondition(format!(
            "another cifs-automount run is working on {} (lock {})",
            mountpoint.display(),
            path.display()
        ))),
    }
}
