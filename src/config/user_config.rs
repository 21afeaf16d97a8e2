//! User-level configuration for afterhours
//!
//! Read from `~/.config/afterhours/config.toml` (platform config dir) when
//! the repository has no config of its own. Same format as `afterhours.toml`.

use super::project_config::{load_config_file, ProjectConfig};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Overrides the user config location
pub const USER_CONFIG_ENV: &str = "AFTERHOURS_CONFIG";

/// Get the user config file path
pub fn user_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(USER_CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|p| p.join("afterhours").join("config.toml"))
}

/// Load the user config, if one exists and parses
pub fn load_user_config() -> Option<ProjectConfig> {
    let path = user_config_path().filter(|p| p.exists())?;
    match load_config_file(&path) {
        Ok(config) => {
            debug!("Loaded user config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            None
        }
    }
}
