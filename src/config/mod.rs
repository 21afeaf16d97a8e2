//! Configuration module for afterhours
//!
//! This module handles:
//! - Project-level configuration (afterhours.toml)
//! - User-level fallback configuration
//! - CLI defaults

mod project_config;
mod user_config;

pub use project_config::{
    load_project_config, CliDefaults, DriverConfig, ProjectConfig, PublishConfig,
    RewriteConfig, DEFAULT_SINCE, PROJECT_CONFIG_FILES,
};
pub use user_config::user_config_path;
