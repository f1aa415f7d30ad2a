//! Request and configuration data structures.

pub mod request;
pub mod settings;
