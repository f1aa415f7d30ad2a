//! CLI routing and command dispatch.

use crate::constants;
use crate::core::exec::{Mode, RunContext, RunReport, StepStatus};
use crate::core::paths::{self, AutomountPaths};
use crate::models::settings::Settings;
use crate::util::privilege;
use crate::util::system::{Account, HostSystem};
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing::debug;

pub mod list;
pub mod mount;
pub mod unmount;

/// Shared context passed to all command handlers.
pub struct CliContext<'a> {
    pub run: RunContext<'a>,
    pub settings: Settings,
    pub dry_run: bool,
    pub json: bool,
}

impl CliContext<'_> {
    pub fn mode(&self) -> Mode {
        if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Live
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "cifs-automount",
    version,
    about = "Provision systemd automount units for CIFS network shares"
)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["mount", "unmount", "list"])
))]
pub struct Cli {
    /// Provision and enable an automount for //SERVER/SHARE at MOUNTPOINT
    #[arg(long, num_args = 2, value_names = ["//SERVER/SHARE", "MOUNTPOINT"])]
    pub mount: Option<Vec<String>>,

    /// Disable and remove the automount for MOUNTPOINT
    #[arg(long, value_name = "MOUNTPOINT")]
    pub unmount: Option<String>,

    /// List the CIFS mounts provisioned in the unit directory
    #[arg(long)]
    pub list: bool,

    /// NAS user name (also the local account that owns the files)
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// NAS password; prompted for when omitted on a terminal
    #[arg(long, env = constants::PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,

    /// SMB protocol version (default from the config file, else 3.0)
    #[arg(long, value_name = "VERSION")]
    pub smb_version: Option<String>,

    /// Dry run: print every action without executing anything
    #[arg(long)]
    pub test: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = paths::config_path(self.config.clone());
        let settings = paths::load_settings(&config)?;
        debug!(config = %config.display(), ?settings, "loaded settings");

        let system = HostSystem;
        let ctx = CliContext {
            run: RunContext {
                system: &system,
                paths: AutomountPaths::from_settings(&settings),
                owner: Account {
                    uid: settings.owner_uid,
                    gid: settings.owner_gid,
                },
                systemctl: settings.systemctl.clone(),
                echo: !self.json,
            },
            settings,
            dry_run: self.test,
            json: self.json,
        };

        if self.list {
            return list::run(&ctx);
        }
        if let Some(mountpoint) = &self.unmount {
            return unmount::run(&ctx, mountpoint);
        }
        if let Some(values) = self.mount.clone() {
            return mount::run(&ctx, &self, &values);
        }
        Ok(())
    }
}

/// Live runs need root; dry runs do not.
pub fn require_privilege(ctx: &CliContext<'_>, action: &str) -> Result<()> {
    if ctx.mode() == Mode::Live {
        privilege::require_root(ctx.run.system, action)?;
    }
    Ok(())
}

/// Emit the final summary (or the whole report with `--json`).
pub fn finish(ctx: &CliContext<'_>, report: &RunReport) -> Result<()> {
    if ctx.json {
        let json = serde_json::to_string_pretty(report).context("serialize report")?;
        println!("{json}");
        return Ok(());
    }
    let warnings = report.warnings();
    match report.mode {
        Mode::DryRun => println!(
            "\nDry run complete: {} action(s) planned, nothing was changed.",
            report.count(StepStatus::Planned)
        ),
        Mode::Live if warnings > 0 => println!(
            "\n{} {}: done with {} warning(s).",
            report.action, report.target, warnings
        ),
        Mode::Live => println!("\n{} {}: done.", report.action, report.target),
    }
    Ok(())
}
