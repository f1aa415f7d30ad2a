//! Builders for the process-manager and mount commands the workflows issue.

use crate::util::system::CommandSpec;
use std::path::Path;

pub fn daemon_reload(systemctl: &str) -> CommandSpec {
    CommandSpec::new(systemctl, ["daemon-reload"])
}

pub fn enable_now(systemctl: &str, unit: &str) -> CommandSpec {
    CommandSpec::new(systemctl, ["enable", "--now", unit])
}

pub fn stop(systemctl: &str, unit: &str) -> CommandSpec {
    CommandSpec::new(systemctl, ["stop", unit])
}

pub fn disable(systemctl: &str, unit: &str) -> CommandSpec {
    CommandSpec::new(systemctl, ["disable", unit])
}

pub fn is_active(systemctl: &str, unit: &str) -> CommandSpec {
    CommandSpec::new(systemctl, ["is-active", "--quiet", unit])
}

pub fn is_enabled(systemctl: &str, unit: &str) -> CommandSpec {
    CommandSpec::new(systemctl, ["is-enabled", "--quiet", unit])
}

pub fn umount(path: &Path) -> CommandSpec {
    CommandSpec::new("umount", [path.display().to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_shapes() {
        assert_eq!(daemon_reload("systemctl").to_string(), "systemctl daemon-reload");
        assert_eq!(
            enable_now("systemctl", "mnt-media.automount").to_string(),
            "systemctl enable --now mnt-media.automount"
        );
        assert_eq!(
            is_active("/bin/systemctl", "x.automount").to_string(),
            "/bin/systemctl is-active --quiet x.automount"
        );
        assert_eq!(umount(Path::new("/mnt/media")).to_string(), "umount /mnt/media");
    }
}
