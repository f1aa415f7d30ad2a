//! Directory layout resolution from the configuration file.

use crate::constants;
use crate::error::{AutomountError, AutomountResult};
use crate::models::settings::Settings;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AutomountPaths {
    pub unit_dir: PathBuf,
    pub credentials_dir: PathBuf,
    pub lock_dir: PathBuf,
}

impl AutomountPaths {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            unit_dir: settings.unit_dir.clone(),
            credentials_dir: settings.credentials_dir.clone(),
            lock_dir: settings.lock_dir.clone(),
        }
    }

    /// `{credentials_dir}/credentials.{user}@{host}`
    pub fn credentials_file(&self, user: &str, host: &str) -> PathBuf {
        self.credentials_dir
            .join(format!("{}{}@{}", constants::CREDENTIALS_PREFIX, user, host))
    }
}

/// Resolve the config file from CLI arg, env var, or the default location.
pub fn config_path(arg: Option<PathBuf>) -> PathBuf {
    if let Some(path) = arg {
        return path;
    }
    if let Some(path) = env::var_os(constants::CONFIG_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from(constants::DEFAULT_CONFIG_PATH)
}

/// Load settings; a missing file yields defaults.
pub fn load_settings(path: &Path) -> AutomountResult<Settings> {
    if !path.exists() {
        debug!(path = %path.display(), "no configuration file, using defaults");
        return Ok(Settings::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|err| AutomountError::io(format!("read {}", path.display()), err))?;
    let settings: Settings = toml::from_str(&content).map_err(|err| AutomountError::Config {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;
    // credentials paths are embedded in a comma-separated Options= value
    let creds = settings.credentials_dir.to_string_lossy();
    if creds.chars().any(|c| c.is_control() || matches!(c, ',' | '=')) {
        return Err(AutomountError::Config {
            path: path.to_path_buf(),
            detail: format!(
                "credentials_dir '{}' must not contain ',' or '='",
                creds.escape_debug()
            ),
        });
    }
    Ok(settings)
}
