//! `--mount` handler.

use crate::cli::{self, Cli, CliContext};
use crate::constants;
use crate::core::mount;
use crate::error::AutomountError;
use crate::models::request::MountRequest;
use anyhow::{Context, Result};
use dialoguer::Password;
use std::io::{self, IsTerminal};
use zeroize::Zeroizing;

pub fn run(ctx: &CliContext<'_>, cli: &Cli, values: &[String]) -> Result<()> {
    let [server, mountpoint] = values else {
        return Err(AutomountError::Usage(
            "--mount takes //SERVER/SHARE and MOUNTPOINT".into(),
        )
        .into());
    };
    let user = cli
        .user
        .as_deref()
        .ok_or_else(|| AutomountError::Usage("--mount requires --user".into()))?;
    let smb_version = cli
        .smb_version
        .as_deref()
        .unwrap_or(ctx.settings.smb_version.as_str());

    let password = match cli.password.as_deref() {
        Some(password) => Zeroizing::new(password.to_string()),
        None => {
            // validate and gate before prompting for anything
            MountRequest::check_args(server, mountpoint, user, smb_version)?;
            cli::require_privilege(ctx, "mount")?;
            prompt_password(user)?
        }
    };
    let request = MountRequest::new(
        server,
        mountpoint,
        user,
        password,
        smb_version,
        ctx.dry_run,
    )?;
    cli::require_privilege(ctx, "mount")?;

    let report = mount::mount(&ctx.run, &request)?;
    cli::finish(ctx, &report)
}

/// Hidden prompt; only possible when stdin is a terminal.
fn prompt_password(user: &str) -> Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        return Err(AutomountError::Usage(format!(
            "--mount requires --password (or {})",
            constants::PASSWORD_ENV
        ))
        .into());
    }
    let password = Password::new()
        .with_prompt(format!("NAS password for {user}"))
        .allow_empty_password(false)
        .interact()
        .context("read password from prompt")?;
    Ok(Zeroizing::new(password))
}
