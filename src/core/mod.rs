//! Core business logic modules.

pub mod credentials;
pub mod exec;
pub mod file_lock;
pub mod inventory;
pub mod mount;
pub mod paths;
pub mod resolver;
pub mod unit_file;
pub mod unit_name;
pub mod unmount;
