//! `--unmount` handler.

use crate::cli::{self, CliContext};
use crate::core::unmount;
use crate::models::request::UnmountRequest;
use anyhow::Result;

pub fn run(ctx: &CliContext<'_>, mountpoint: &str) -> Result<()> {
    let request = UnmountRequest::new(mountpoint, ctx.dry_run)?;
    cli::require_privilege(ctx, "unmount")?;
    let report = unmount::unmount(&ctx.run, &request)?;
    cli::finish(ctx, &report)
}
