//! Mount workflow: provision the unit pair for a CIFS share and activate it.
//!
//! `Validated → DirectoryReady → CredentialsReady → UnitsWritten →
//! DaemonReloaded → Enabled`. Every precondition is checked before the
//! first mutation; any failure after that aborts immediately.

use crate::constants;
use crate::core::credentials::{self, CredentialRecord};
use crate::core::exec::{Action, Executor, FileSpec, Mode, RunContext, RunReport, Step, StepStatus};
use crate::core::file_lock;
use crate::core::resolver::{self, ResolvedHost};
use crate::core::unit_file;
use crate::core::unit_name::UnitNamePair;
use crate::error::{AutomountError, AutomountResult};
use crate::models::request::MountRequest;
use crate::util::system::Account;
use crate::util::systemd;
use std::fs;
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validated,
    DirectoryReady,
    CredentialsReady,
    UnitsWritten,
    DaemonReloaded,
    Enabled,
}

fn enter(stage: Stage) {
    debug!(?stage, "mount stage");
}

pub fn mount(ctx: &RunContext<'_>, request: &MountRequest) -> AutomountResult<RunReport> {
    let mode = if request.dry_run { Mode::DryRun } else { Mode::Live };
    let names = UnitNamePair::derive(&ctx.paths.unit_dir, &request.mountpoint);
    // checked before the lock so a rejected run writes nothing at all,
    // then again once the lock is held
    check_preconditions(ctx, request, &names)?;
    let _lock = file_lock::lock_mountpoint(
        &ctx.paths.lock_dir,
        &names.base,
        &request.mountpoint,
        mode,
    )?;
    let account = check_preconditions(ctx, request, &names)?;
    enter(Stage::Validated);

    let host = resolver::resolve(ctx.system, &request.server.host);
    let record = CredentialRecord::new(
        ctx.paths
            .credentials_file(&request.username, &request.server.host),
        ctx.owner,
    );
    if ctx.echo {
        print_banner(request, &host, account, &record, &names, mode);
    }

    let mut exec = Executor::new(ctx, mode, "mount", &request.mountpoint);

    if request.mountpoint.is_dir() {
        exec.record(
            format!("mountpoint {} exists, left as-is", request.mountpoint.display()),
            StepStatus::Info,
            None,
        );
    } else {
        exec.execute(vec![Step::fatal(
            format!("create mountpoint directory {}", request.mountpoint.display()),
            Action::CreateDir {
                path: request.mountpoint.clone(),
                mode: constants::MOUNTPOINT_DIR_MODE,
                owner: Some(ctx.owner),
            },
        )])?;
    }
    enter(Stage::DirectoryReady);

    credentials::ensure(&mut exec, &record, &request.username, &request.password)?;
    enter(Stage::CredentialsReady);

    let mount_unit = unit_file::build_mount_unit(request, &host, &record.path, account);
    let automount_unit = unit_file::build_automount_unit(request);
    let unit_spec = FileSpec {
        mode: constants::UNIT_FILE_MODE,
        owner: None,
    };
    exec.execute(vec![
        Step::fatal(
            format!("write {}", names.mount_path.display()),
            Action::WriteFile {
                path: names.mount_path.clone(),
                content: Zeroizing::new(mount_unit.to_string()),
                spec: unit_spec,
            },
        ),
        Step::fatal(
            format!("write {}", names.automount_path.display()),
            Action::WriteFile {
                path: names.automount_path.clone(),
                content: Zeroizing::new(automount_unit.to_string()),
                spec: unit_spec,
            },
        ),
    ])?;
    enter(Stage::UnitsWritten);

    exec.execute(vec![Step::fatal(
        "reload systemd unit files",
        Action::Run(systemd::daemon_reload(&ctx.systemctl)),
    )])?;
    enter(Stage::DaemonReloaded);

    exec.execute(vec![Step::fatal(
        format!("enable and start {}", names.automount_unit),
        Action::Run(systemd::enable_now(&ctx.systemctl, &names.automount_unit)),
    )])?;
    enter(Stage::Enabled);

    Ok(exec.finish())
}

/// Read-only checks; nothing has been changed when one fails.
fn check_preconditions(
    ctx: &RunContext<'_>,
    request: &MountRequest,
    names: &UnitNamePair,
) -> AutomountResult<Account> {
    let mountpoint = &request.mountpoint;
    if ctx.system.is_mounted(mountpoint) {
        return Err(AutomountError::Precondition(format!(
            "{} is already a mountpoint; run --unmount first",
            mountpoint.display()
        )));
    }
    if let Ok(meta) = fs::symlink_metadata(mountpoint) {
        if !meta.is_dir() {
            return Err(AutomountError::Precondition(format!(
                "{} exists and is not a directory",
                mountpoint.display()
            )));
        }
    }
    for unit in [&names.mount_path, &names.automount_path] {
        if fs::symlink_metadata(unit).is_ok() {
            return Err(AutomountError::Precondition(format!(
                "{} already exists; run --unmount {} first",
                unit.display(),
                mountpoint.display()
            )));
        }
    }
    ctx.system
        .lookup_user(&request.username)?
        .ok_or_else(|| {
            AutomountError::Precondition(format!(
                "local user '{}' not found (needed for uid/gid)",
                request.username
            ))
        })
}

fn print_banner(
    request: &MountRequest,
    host: &ResolvedHost,
    account: Account,
    record: &CredentialRecord,
    names: &UnitNamePair,
    mode: Mode,
) {
    let suffix = if mode == Mode::DryRun { " (dry run, nothing will change)" } else { "" };
    println!(
        "Mount {} on {}{}",
        request.server,
        request.mountpoint.display(),
        suffix
    );
    println!("  server:      {} -> {}", host.original, host.address);
    println!("  share:       {}", request.server.share);
    println!(
        "  user:        {} (uid {}, gid {})",
        request.username, account.uid, account.gid
    );
    println!("  smb version: {}", request.smb_version);
    println!("  credentials: {}", record.path.display());
    println!("  mount unit:  {}", names.mount_path.display());
    println!("  automount:   {}", names.automount_path.display());
}


#[cfg(test)]
mod tests {
    use super::fixture::Fixture;
    use super::*;
    use crate::core::unmount;
    use crate::models::request::UnmountRequest;
    use crate::util::fs as auto_fs;
    use std::path::Path;

    #[test]
    fn test_mount_writes_units_and_enables() {
        let fx = Fixture::new();
        let report = mount(&fx.ctx(), &fx.request(false)).unwrap();
        let names = fx.names();

        let unit = unit_file::UnitFile::parse(&fs::read_to_string(&names.mount_path).unwrap());
        assert_eq!(unit.get("Mount", "What"), Some("//192.168.1.10/media"));
        assert_eq!(
            unit.get("Mount", "Options").unwrap(),
            format!(
                "credentials={},uid=1000,gid=1000,iocharset=utf8,vers=3.0,{}",
                fx.credentials().display(),
                "nofail,_netdev,x-systemd.automount"
            )
        );
        let automount =
            unit_file::UnitFile::parse(&fs::read_to_string(&names.automount_path).unwrap());
        assert_eq!(automount.get("Automount", "TimeoutIdleSec"), Some("0"));
        assert_eq!(
            fs::read_to_string(fx.credentials()).unwrap(),
            "username=alice\npassword=x"
        );
        let (_, mode) = auto_fs::owner_and_mode(&fx.mountpoint()).unwrap();
        assert_eq!(mode, 0o755);
        assert_eq!(
            fx.system.command_lines(),
            vec![
                "systemctl daemon-reload".to_string(),
                format!("systemctl enable --now {}", names.automount_unit),
            ]
        );
        assert_eq!(report.count(StepStatus::Failed), 0);
    }

    #[test]
    fn test_dry_run_has_no_side_effects() {
        let fx = Fixture::new();
        let report = mount(&fx.ctx(), &fx.request(true)).unwrap();
        assert!(!fx.mountpoint().exists());
        assert!(!fx.credentials().exists());
        assert!(!fx.dir.path().join("units").exists());
        assert!(!fx.dir.path().join("lock").exists());
        assert!(fx.system.commands.borrow().is_empty());
        assert_eq!(report.count(StepStatus::Planned), 6);
    }

    #[test]
    fn test_dry_run_plan_matches_live_actions() {
        let fx = Fixture::new();
        let planned: Vec<String> = mount(&fx.ctx(), &fx.request(true))
            .unwrap()
            .actions()
            .into_iter()
            .map(String::from)
            .collect();
        let live = mount(&fx.ctx(), &fx.request(false)).unwrap();
        assert_eq!(planned, live.actions());
    }

    #[test]
    fn test_already_mounted_aborts_without_writes() {
        let fx = Fixture::new();
        fx.system.mounted.borrow_mut().insert(fx.mountpoint());
        let err = mount(&fx.ctx(), &fx.request(false)).unwrap_err();
        assert!(matches!(err, AutomountError::Precondition(_)));
        assert!(!fx.mountpoint().exists());
        assert!(!fx.credentials().exists());
        assert!(!fx.dir.path().join("lock").exists());
        assert!(!fx.dir.path().join("units").exists());
        assert!(fx.system.commands.borrow().is_empty());
    }

    #[test]
    fn test_existing_unit_file_aborts() {
        let fx = Fixture::new();
        let names = fx.names();
        fs::create_dir_all(names.automount_path.parent().unwrap()).unwrap();
        fs::write(&names.automount_path, "[Automount]\n").unwrap();
        let err = mount(&fx.ctx(), &fx.request(false)).unwrap_err();
        assert!(matches!(err, AutomountError::Precondition(_)));
        assert!(!names.mount_path.exists());
        assert!(!fx.mountpoint().exists());
        assert_eq!(fs::read_to_string(&names.automount_path).unwrap(), "[Automount]\n");
    }

    #[test]
    fn test_unknown_local_user_aborts() {
        let mut fx = Fixture::new();
        fx.system.users.clear();
        let err = mount(&fx.ctx(), &fx.request(false)).unwrap_err();
        assert!(err.to_string().contains("local user 'alice' not found"));
        assert!(!fx.mountpoint().exists());
    }

    #[test]
    fn test_enable_failure_is_fatal() {
        let mut fx = Fixture::new();
        let unit = fx.names().automount_unit;
        fx.system
            .failing
            .insert(format!("systemctl enable --now {unit}"));
        let err = mount(&fx.ctx(), &fx.request(false)).unwrap_err();
        assert!(matches!(err, AutomountError::FatalCommand { .. }));
        // partial state is left for --unmount to clean up
        assert!(fx.names().mount_path.exists());
    }

    #[test]
    fn test_reload_failure_skips_enable() {
        let mut fx = Fixture::new();
        fx.system.failing.insert("systemctl daemon-reload".into());
        assert!(mount(&fx.ctx(), &fx.request(false)).is_err());
        assert_eq!(fx.system.command_lines(), vec!["systemctl daemon-reload"]);
    }

    #[test]
    fn test_unresolvable_host_uses_name() {
        let mut fx = Fixture::new();
        fx.system.hosts.clear();
        mount(&fx.ctx(), &fx.request(false)).unwrap();
        let text = fs::read_to_string(fx.names().mount_path).unwrap();
        assert!(text.contains("What=//nas.local/media"));
        assert!(text.contains("# WARNING: could not resolve nas.local"));
    }

    #[test]
    fn test_mount_unmount_mount_cycle() {
        let fx = Fixture::new();
        mount(&fx.ctx(), &fx.request(false)).unwrap();
        let creds_before = fs::read_to_string(fx.credentials()).unwrap();

        let target = fx.mountpoint().display().to_string();
        let unmount_req = UnmountRequest::new(&target, false).unwrap();
        let report = unmount::unmount(&fx.ctx(), &unmount_req).unwrap();
        assert_eq!(report.warnings(), 0);

        let names = fx.names();
        assert!(!names.mount_path.exists());
        assert!(!names.automount_path.exists());
        assert_eq!(fs::read_to_string(fx.credentials()).unwrap(), creds_before);
        assert!(fx.mountpoint().is_dir());

        mount(&fx.ctx(), &fx.request(false)).unwrap();
        assert!(names.mount_path.exists());
    }

    #[test]
    fn test_mountpoint_that_is_a_file_aborts() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.mountpoint().parent().unwrap()).unwrap();
        fs::write(fx.mountpoint(), "").unwrap();
        let err = mount(&fx.ctx(), &fx.request(false)).unwrap_err();
        assert!(matches!(err, AutomountError::Precondition(_)));
        assert!(!Path::new(&fx.names().mount_path).exists());
    }
}
