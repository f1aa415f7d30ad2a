//! Execution engine: the one place side effects happen.
//!
//! Workflows describe their work as [`Step`]s. The engine evaluates each
//! step's guard, performs it through one of the primitives (`run`,
//! `write_file`, `create_dir`, `remove_file`) and applies the step's
//! [`Policy`] to failures. In dry-run mode the primitives only report what
//! they would do, and guards that need an external command are left
//! undecided, so a dry run spawns nothing and writes nothing.

use crate::core::paths::AutomountPaths;
use crate::error::{AutomountError, AutomountResult};
use crate::util::fs as auto_fs;
use crate::util::system::{Account, CommandSpec, System};
use crate::util::systemd;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, DirBuilder};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Everything a workflow needs besides its request.
pub struct RunContext<'a> {
    pub system: &'a dyn System,
    pub paths: AutomountPaths,
    /// Owner for created directories and credentials files.
    pub owner: Account,
    pub systemctl: String,
    /// Print outcomes as they happen.
    pub echo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Live,
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// A failure aborts the workflow.
    Fatal,
    /// A failure is reported and the workflow continues.
    BestEffort,
}

/// Condition under which a step runs.
#[derive(Debug, Clone)]
pub enum Guard {
    UnitActive(String),
    UnitEnabled(String),
    Mounted(PathBuf),
    Exists(PathBuf),
    Absent(PathBuf),
}

impl Guard {
    fn unmet_reason(&self) -> String {
        match self {
            Guard::UnitActive(unit) => format!("{unit} is not active"),
            Guard::UnitEnabled(unit) => format!("{unit} is not enabled"),
            Guard::Mounted(path) => format!("{} is not mounted", path.display()),
            Guard::Exists(path) => format!("{} does not exist", path.display()),
            Guard::Absent(path) => format!("{} already exists", path.display()),
        }
    }

    fn condition(&self) -> String {
        match self {
            Guard::UnitActive(unit) => format!("if {unit} is active"),
            Guard::UnitEnabled(unit) => format!("if {unit} is enabled"),
            Guard::Mounted(path) => format!("if {} is mounted", path.display()),
            Guard::Exists(path) => format!("if {} exists", path.display()),
            Guard::Absent(path) => format!("if {} is absent", path.display()),
        }
    }
}

enum GuardState {
    Met,
    Unmet,
    /// Needs an external query that a dry run must not make.
    Undecided,
}

#[derive(Debug, Clone, Copy)]
pub struct FileSpec {
    pub mode: u32,
    pub owner: Option<Account>,
}

pub enum Action {
    Run(CommandSpec),
    WriteFile {
        path: PathBuf,
        content: Zeroizing<String>,
        spec: FileSpec,
    },
    CreateDir {
        path: PathBuf,
        mode: u32,
        owner: Option<Account>,
    },
    RemoveFile(PathBuf),
}

pub struct Step {
    pub description: String,
    pub action: Action,
    pub guard: Option<Guard>,
    pub policy: Policy,
}

impl Step {
    pub fn fatal(description: impl Into<String>, action: Action) -> Self {
        Self {
            description: description.into(),
            action,
            guard: None,
            policy: Policy::Fatal,
        }
    }

    pub fn best_effort(description: impl Into<String>, action: Action) -> Self {
        Self {
            description: description.into(),
            action,
            guard: None,
            policy: Policy::BestEffort,
        }
    }

    pub fn when(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Done,
    Planned,
    Skipped,
    Info,
    Warning,
    Failed,
}

impl StepStatus {
    fn tag(self) -> &'static str {
        match self {
            StepStatus::Done => "[PASS]",
            StepStatus::Planned => "[PLAN]",
            StepStatus::Skipped | StepStatus::Info => "[INFO]",
            StepStatus::Warning => "[WARN]",
            StepStatus::Failed => "[FAIL]",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub action: String,
    pub target: String,
    pub mode: Mode,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepOutcome>,
}

impl RunReport {
    pub fn warnings(&self) -> usize {
        self.count(StepStatus::Warning)
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// Descriptions of the steps that did, or would, change something.
    pub fn actions(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Done | StepStatus::Planned))
            .map(|s| s.description.as_str())
            .collect()
    }
}

pub struct Executor<'a> {
    system: &'a dyn System,
    systemctl: &'a str,
    mode: Mode,
    echo: bool,
    /// A dry run left an earlier guard open, so later state may differ.
    undecided: bool,
    report: RunReport,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: &'a RunContext<'a>, mode: Mode, action: &str, target: &Path) -> Self {
        Self {
            system: ctx.system,
            systemctl: &ctx.systemctl,
            mode,
            echo: ctx.echo,
            undecided: false,
            report: RunReport {
                action: action.to_string(),
                target: target.display().to_string(),
                mode,
                started_at: Utc::now(),
                steps: Vec::new(),
            },
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn record(
        &mut self,
        description: impl Into<String>,
        status: StepStatus,
        detail: Option<String>,
    ) {
        let outcome = StepOutcome {
            description: description.into(),
            status,
            detail,
        };
        if self.echo {
            match &outcome.detail {
                Some(detail) => println!("  {} {} ({})", status.tag(), outcome.description, detail),
                None => println!("  {} {}", status.tag(), outcome.description),
            }
        }
        self.report.steps.push(outcome);
    }

    /// Run steps in order, applying guards and policies.
    pub fn execute(&mut self, steps: Vec<Step>) -> AutomountResult<()> {
        for step in steps {
            let mut description = step.description;
            if let Some(guard) = &step.guard {
                match self.check_guard(guard) {
                    GuardState::Met => {}
                    GuardState::Unmet => {
                        let reason = guard.unmet_reason();
                        self.record(description, StepStatus::Skipped, Some(reason));
                        continue;
                    }
                    GuardState::Undecided => {
                        self.undecided = true;
                        description = format!("{description} ({})", guard.condition());
                    }
                }
            }

            let result = match &step.action {
                Action::Run(cmd) => self.run(&description, cmd),
                Action::WriteFile {
                    path,
                    content,
                    spec,
                } => self.write_file(&description, path, content, *spec),
                Action::CreateDir { path, mode, owner } => {
                    self.create_dir(&description, path, *mode, *owner)
                }
                Action::RemoveFile(path) => self.remove_file(&description, path),
            };

            match (result, step.policy) {
                (Ok(status), _) => self.record(description, status, None),
                (Err(detail), Policy::Fatal) => {
                    self.record(description.clone(), StepStatus::Failed, Some(detail.clone()));
                    return Err(AutomountError::FatalCommand {
                        step: description,
                        detail,
                    });
                }
                (Err(detail), Policy::BestEffort) => {
                    warn!(step = %description, %detail, "best-effort step failed");
                    self.record(description, StepStatus::Warning, Some(detail));
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> RunReport {
        self.report
    }

    fn check_guard(&self, guard: &Guard) -> GuardState {
        let query = match guard {
            Guard::UnitActive(unit) => systemd::is_active(self.systemctl, unit),
            Guard::UnitEnabled(unit) => systemd::is_enabled(self.systemctl, unit),
            Guard::Mounted(path) => {
                // an undecided stop may still take the mount away first
                return match self.system.is_mounted(path) {
                    true if self.mode == Mode::DryRun && self.undecided => GuardState::Undecided,
                    mounted => met(mounted),
                };
            }
            Guard::Exists(path) => return met(fs::symlink_metadata(path).is_ok()),
            Guard::Absent(path) => return met(fs::symlink_metadata(path).is_err()),
        };
        if self.mode == Mode::DryRun {
            return GuardState::Undecided;
        }
        match self.system.run(&query) {
            Ok(output) => met(output.success),
            Err(err) => {
                debug!(command = %query, error = %err, "state query failed");
                GuardState::Undecided
            }
        }
    }

    /// Invoke an external command.
    pub fn run(&self, description: &str, cmd: &CommandSpec) -> Result<StepStatus, String> {
        if self.mode == Mode::DryRun {
            debug!(step = description, command = %cmd, "dry-run: not executing");
            return Ok(StepStatus::Planned);
        }
        info!(step = description, command = %cmd, "running");
        let output = self
            .system
            .run(cmd)
            .map_err(|err| format!("cannot run {}: {err}", cmd.program))?;
        if output.success {
            Ok(StepStatus::Done)
        } else {
            Err(format!("`{cmd}`: {}", output.failure_detail()))
        }
    }

    /// Write `content` verbatim, creating parent directories as needed.
    ///
    /// The file is staged next to its target with its final mode and owner,
    /// then renamed into place.
    pub fn write_file(
        &self,
        description: &str,
        path: &Path,
        content: &str,
        spec: FileSpec,
    ) -> Result<StepStatus, String> {
        if self.mode == Mode::DryRun {
            debug!(step = description, path = %path.display(), "dry-run: not writing");
            return Ok(StepStatus::Planned);
        }
        info!(step = description, path = %path.display(), "writing");
        let parent = path
            .parent()
            .ok_or_else(|| format!("{} has no parent directory", path.display()))?;
        fs::create_dir_all(parent)
            .map_err(|err| format!("create directory {}: {err}", parent.display()))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".cifs-automount-")
            .tempfile_in(parent)
            .map_err(|err| format!("create temp file in {}: {err}", parent.display()))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.flush())
            .map_err(|err| format!("write {}: {err}", path.display()))?;
        auto_fs::set_permissions(tmp.path(), spec.mode).map_err(|err| err.chain())?;
        if let Some(owner) = spec.owner {
            auto_fs::set_owner(tmp.path(), owner).map_err(|err| err.chain())?;
        }
        tmp.persist(path)
            .map_err(|err| format!("persist {}: {}", path.display(), err.error))?;
        Ok(StepStatus::Done)
    }

    pub fn create_dir(
        &self,
        description: &str,
        path: &Path,
        mode: u32,
        owner: Option<Account>,
    ) -> Result<StepStatus, String> {
        if self.mode == Mode::DryRun {
            debug!(step = description, path = %path.display(), "dry-run: not creating");
            return Ok(StepStatus::Planned);
        }
        info!(step = description, path = %path.display(), "creating directory");
        DirBuilder::new()
            .recursive(true)
            .create(path)
            .map_err(|err| format!("create directory {}: {err}", path.display()))?;
        auto_fs::set_permissions(path, mode).map_err(|err| err.chain())?;
        if let Some(owner) = owner {
            auto_fs::set_owner(path, owner).map_err(|err| err.chain())?;
        }
        Ok(StepStatus::Done)
    }

    pub fn remove_file(&self, description: &str, path: &Path) -> Result<StepStatus, String> {
        if self.mode == Mode::DryRun {
            debug!(step = description, path = %path.display(), "dry-run: not removing");
            return Ok(StepStatus::Planned);
        }
        info!(step = description, path = %path.display(), "removing");
        match fs::remove_file(path) {
            Ok(()) => Ok(StepStatus::Done),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(StepStatus::Done),
            Err(err) => Err(format!("remove {}: {err}", path.display())),
        }
    }
}

fn met(condition: bool) -> GuardState {
    if condition {
        GuardState::Met
    } else {
        GuardState::Unmet
    }
}
