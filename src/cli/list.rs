//! `--list` handler. Read-only, no privilege needed.

use crate::cli::CliContext;
use crate::core::inventory;
use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

pub fn run(ctx: &CliContext<'_>) -> Result<()> {
    let unit_dir = &ctx.run.paths.unit_dir;
    let mounts = inventory::list(unit_dir)?;

    if ctx.json {
        let json = serde_json::to_string_pretty(&mounts).context("serialize list")?;
        println!("{json}");
        return Ok(());
    }

    if mounts.is_empty() {
        println!("No CIFS mounts found in {}", unit_dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Mountpoint").add_attribute(Attribute::Bold),
        Cell::new("Share").add_attribute(Attribute::Bold),
        Cell::new("Unit").add_attribute(Attribute::Bold),
        Cell::new("Automount").add_attribute(Attribute::Bold),
    ]);
    for mount in &mounts {
        let mountpoint = match &mount.mountpoint {
            Some(path) => path.display().to_string(),
            None => mount.where_.clone(),
        };
        table.add_row(vec![
            Cell::new(mountpoint),
            Cell::new(&mount.what),
            Cell::new(&mount.unit),
            Cell::new(if mount.automount { "yes" } else { "missing" }),
        ]);
    }
    println!("{table}");
    Ok(())
}
