//! Unmount workflow: tear down the unit pair for a mountpoint.
//!
//! Every step is best-effort so a half-provisioned mount can always be
//! cleaned up. The credentials file and the mountpoint directory stay.

use crate::core::exec::{Action, Executor, Guard, Mode, RunContext, RunReport, Step};
use crate::core::file_lock;
use crate::core::unit_name::UnitNamePair;
use crate::error::AutomountResult;
use crate::models::request::UnmountRequest;
use crate::util::systemd;
use tracing::debug;

pub fn unmount(ctx: &RunContext<'_>, request: &UnmountRequest) -> AutomountResult<RunReport> {
    let mode = if request.dry_run { Mode::DryRun } else { Mode::Live };
    let mountpoint = &request.mountpoint;
    let names = UnitNamePair::derive(&ctx.paths.unit_dir, mountpoint);
    let _lock = file_lock::lock_mountpoint(&ctx.paths.lock_dir, &names.base, mountpoint, mode)?;

    if ctx.echo {
        let suffix = if mode == Mode::DryRun { " (dry run, nothing will change)" } else { "" };
        println!("Unmount {}{}", mountpoint.display(), suffix);
        println!("  mount unit:  {}", names.mount_path.display());
        println!("  automount:   {}", names.automount_path.display());
    }

    let systemctl = ctx.systemctl.as_str();
    let automount = names.automount_unit.as_str();
    let steps = vec![
        Step::best_effort(
            format!("stop {automount}"),
            Action::Run(systemd::stop(systemctl, automount)),
        )
        .when(Guard::UnitActive(automount.to_string())),
        Step::best_effort(
            format!("disable {automount}"),
            Action::Run(systemd::disable(systemctl, automount)),
        )
        .when(Guard::UnitEnabled(automount.to_string())),
        Step::best_effort(
            format!("unmount {}", mountpoint.display()),
            Action::Run(systemd::umount(mountpoint)),
        )
        .when(Guard::Mounted(mountpoint.clone())),
        Step::best_effort(
            format!("remove {}", names.automount_path.display()),
            Action::RemoveFile(names.automount_path.clone()),
        )
        .when(Guard::Exists(names.automount_path.clone())),
        Step::best_effort(
            format!("remove {}", names.mount_path.display()),
            Action::RemoveFile(names.mount_path.clone()),
        )
        .when(Guard::Exists(names.mount_path.clone())),
        Step::best_effort(
            "reload systemd unit files",
            Action::Run(systemd::daemon_reload(systemctl)),
        ),
    ];

    let mut exec = Executor::new(ctx, mode, "unmount", mountpoint);
    exec.execute(steps)?;
    let report = exec.finish();
    debug!(warnings = report.warnings(), "unmount finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::exec::StepStatus;
    use crate::core::mount::{self, fixture::Fixture};

    fn request(fx: &Fixture, dry_run: bool) -> UnmountRequest {
        UnmountRequest::new(&fx.mountpoint().display().to_string(), dry_run).unwrap()
    }

    #[test]
    fn test_unmount_without_configuration_succeeds() {
        let fx = Fixture::new();
        let report = unmount(&fx.ctx(), &request(&fx, false)).unwrap();
        assert_eq!(report.count(StepStatus::Skipped), 5);
        assert_eq!(report.warnings(), 0);
        let unit = fx.names().automount_unit;
        assert_eq!(
            fx.system.command_lines(),
            vec![
                format!("systemctl is-active --quiet {unit}"),
                format!("systemctl is-enabled --quiet {unit}"),
                "systemctl daemon-reload".to_string(),
            ]
        );
    }

    #[test]
    fn test_unmount_runs_steps_in_order() {
        let fx = Fixture::new();
        mount::mount(&fx.ctx(), &fx.request(false)).unwrap();
        fx.system.mounted.borrow_mut().insert(fx.mountpoint());
        fx.system.commands.borrow_mut().clear();

        unmount(&fx.ctx(), &request(&fx, false)).unwrap();
        let unit = fx.names().automount_unit;
        let lines = fx.system.command_lines();
        assert_eq!(
            lines,
            vec![
                format!("systemctl is-active --quiet {unit}"),
                format!("systemctl stop {unit}"),
                format!("systemctl is-enabled --quiet {unit}"),
                format!("systemctl disable {unit}"),
                format!("umount {}", fx.mountpoint().display()),
                "systemctl daemon-reload".to_string(),
            ]
        );
        assert!(!fx.system.mounted.borrow().contains(&fx.mountpoint()));
    }

    #[test]
    fn test_unmount_keeps_credentials_and_directory() {
        let fx = Fixture::new();
        mount::mount(&fx.ctx(), &fx.request(false)).unwrap();
        unmount(&fx.ctx(), &request(&fx, false)).unwrap();
        assert!(fx.credentials().exists());
        assert!(fx.mountpoint().is_dir());
        assert!(!fx.names().mount_path.exists());
    }

    #[test]
    fn test_failures_are_warnings() {
        let mut fx = Fixture::new();
        mount::mount(&fx.ctx(), &fx.request(false)).unwrap();
        let unit = fx.names().automount_unit;
        fx.system.failing.insert(format!("systemctl stop {unit}"));
        fx.system.failing.insert("systemctl daemon-reload".into());

        let report = unmount(&fx.ctx(), &request(&fx, false)).unwrap();
        assert_eq!(report.warnings(), 2);
        // later steps still ran
        assert!(!fx.names().automount_path.exists());
        assert!(!fx.names().mount_path.exists());
    }

    #[test]
    fn test_dry_run_spawns_nothing() {
        let fx = Fixture::new();
        mount::mount(&fx.ctx(), &fx.request(false)).unwrap();
        fx.system.commands.borrow_mut().clear();

        let report = unmount(&fx.ctx(), &request(&fx, true)).unwrap();
        assert!(fx.system.commands.borrow().is_empty());
        assert!(fx.names().mount_path.exists());
        assert!(fx.names().automount_path.exists());
        let unit = fx.names().automount_unit;
        assert_eq!(
            report.steps[0].description,
            format!("stop {unit} (if {unit} is active)")
        );
        // not mounted: decided from the mount table
        assert_eq!(report.steps[2].status, StepStatus::Skipped);
        assert_eq!(report.count(StepStatus::Planned), 5);
    }

    /// Description without the dry-run condition suffix.
    fn plain(description: &str) -> &str {
        description
            .split_once(" (if ")
            .map_or(description, |(head, _)| head)
    }

    #[test]
    fn test_dry_run_plan_matches_live_actions() {
        let mut fx = Fixture::new();
        mount::mount(&fx.ctx(), &fx.request(false)).unwrap();
        // the active automount shows up in the mount table until stopped
        fx.system
            .autofs
            .insert(fx.names().automount_unit, fx.mountpoint());
        fx.system.mounted.borrow_mut().insert(fx.mountpoint());

        let planned = unmount(&fx.ctx(), &request(&fx, true)).unwrap();
        let unmount_step = &planned.steps[2];
        assert_eq!(unmount_step.status, StepStatus::Planned);
        assert!(unmount_step.description.ends_with("is mounted)"));

        let live = unmount(&fx.ctx(), &request(&fx, false)).unwrap();
        assert_eq!(live.steps[2].status, StepStatus::Skipped);

        let planned_steps: Vec<&str> =
            planned.steps.iter().map(|s| plain(&s.description)).collect();
        let live_steps: Vec<&str> = live.steps.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(planned_steps, live_steps);
        // every live action was planned, and every unconditional plan ran
        for (plan, done) in planned.steps.iter().zip(&live.steps) {
            if done.status == StepStatus::Done {
                assert_eq!(plan.status, StepStatus::Planned, "{}", done.description);
            }
            if plan.status == StepStatus::Planned && !plan.description.contains(" (if ") {
                assert_eq!(done.status, StepStatus::Done, "{}", done.description);
            }
        }
    }
}
