//! Systemd automount provisioning for CIFS network shares.
//!
//! `--mount` writes a credentials file plus a `.mount`/`.automount` unit
//! pair and enables the automount; `--unmount` reverses it, keeping the
//! credentials and the mountpoint directory. `--test` previews either
//! without touching the system.
//!
//! ## Modules
//! - `cli`: Command-line handlers
//! - `core`: Workflows, unit naming, unit rendering, execution engine
//! - `models`: Requests and settings
//! - `util`: System boundary (commands, mount table, accounts), fs helpers

pub mod cli;
pub mod constants;
pub mod core;
pub mod error;
pub mod models;
pub mod util;
