use crate::error::{AutomountError, AutomountResult};
use crate::util::system::Account;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

pub fn set_permissions(path: &Path, mode: u32) -> AutomountResult<()> {
    let perm = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, perm).map_err(|err| {
        AutomountError::io(format!("set permissions {:o} on {}", mode, path.display()), err)
    })
}

pub fn set_owner(path: &Path, owner: Account) -> AutomountResult<()> {
    nix::unistd::chown(
        path,
        Some(nix::unistd::Uid::from_raw(owner.uid)),
        Some(nix::unistd::Gid::from_raw(owner.gid)),
    )
    .map_err(|errno| {
        AutomountError::io(
            format!("chown {}:{} {}", owner.uid, owner.gid, path.display()),
            std::io::Error::from(errno),
        )
    })
}

/// Current owner and permission bits, `None` if the path cannot be stat'ed.
pub fn owner_and_mode(path: &Path) -> Option<(Account, u32)> {
    let meta = fs::metadata(path).ok()?;
    Some((
        Account {
            uid: meta.uid(),
            gid: meta.gid(),
        },
        meta.permissions().mode() & 0o7777,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_permissions_and_read_back() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();
        set_permissions(&file, 0o600).unwrap();
        let (_, mode) = owner_and_mode(&file).unwrap();
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_owner_and_mode_missing() {
        let dir = TempDir::new().unwrap();
        assert!(owner_and_mode(&dir.path().join("missing")).is_none());
    }
}
