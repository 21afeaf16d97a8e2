//! Project-level configuration support
//!
//! Loads per-project configuration from `afterhours.toml` or
//! `.afterhoursrc.json` in the repository root, falling back to the user
//! config (see [`super::user_config`]) and then to built-in defaults.
//!
//! # Configuration Format
//!
//! ```toml
//! # afterhours.toml
//!
//! boundary = "skip"   # or "abort"
//!
//! [policy]
//! weekdays = ["mon", "tue", "wed", "thu", "fri"]
//! start_hour = 9
//! end_hour = 18       # inclusive
//!
//! [jitter]
//! min_secs = 10
//! max_secs = 50
//!
//! [driver]
//! max_passes = 1000
//! query_retries = 2
//!
//! [rewrite]
//! backend = "native"  # or "filter-branch"
//! timeout_secs = 600
//!
//! [publish]
//! enabled = true
//! remote = "origin"
//! branch = "main"
//! timeout_secs = 120
//! retries = 0
//! ignore_errors = true
//!
//! [defaults]
//! since = "2.weeks"
//! format = "text"
//! ```

use crate::driver::DriverSettings;
use crate::error::RetimeResult;
use crate::git::RewriteBackend;
use crate::normalizer::{BoundaryPolicy, JitterRange, Normalizer};
use crate::policy::TimeWindow;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// File names searched in the repository root, in order
pub const PROJECT_CONFIG_FILES: &[&str] = &["afterhours.toml", ".afterhoursrc.json"];

/// Default lower bound for the commit range
pub const DEFAULT_SINCE: &str = "2.weeks";

/// Project-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Disallowed time window
    pub policy: TimeWindow,

    /// Jitter added after an anchor date
    pub jitter: JitterRange,

    /// Handling of a disallowed first commit
    pub boundary: BoundaryPolicy,

    pub driver: DriverConfig,

    pub rewrite: RewriteConfig,

    pub publish: PublishConfig,

    /// CLI defaults
    pub defaults: CliDefaults,
}

/// Fixed-point loop limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub max_passes: usize,
    pub query_retries: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        let settings = DriverSettings::default();
        Self {
            max_passes: settings.max_passes,
            query_retries: settings.query_retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub backend: RewriteBackend,
    /// Timeout for a filter-branch run (0 = none)
    pub timeout_secs: u64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            backend: RewriteBackend::Native,
            timeout_secs: 600,
        }
    }
}

/// Force-push settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Push after every rewrite
    pub enabled: bool,
    /// Remote name; the branch's upstream when unset
    pub remote: Option<String>,
    /// Branch to push (only used with `remote`)
    pub branch: Option<String>,
    pub timeout_secs: u64,
    /// Extra attempts after a failed push
    pub retries: usize,
    /// Log push failures instead of aborting
    pub ignore_errors: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remote: None,
            branch: None,
            timeout_secs: 120,
            retries: 0,
            ignore_errors: true,
        }
    }
}

/// Defaults for CLI flags that were not given explicitly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliDefaults {
    /// Lower bound for the commit range (e.g. "2.weeks")
    pub since: Option<String>,
    /// Output format ("text" or "json")
    pub format: Option<String>,
    /// Jitter seed for reproducible runs
    pub seed: Option<u64>,
}

impl ProjectConfig {
    /// Check the window and jitter range.
    pub fn validate(&self) -> RetimeResult<()> {
        self.policy.validate()?;
        self.jitter.validate()
    }

    /// Normalizer built from the policy, jitter and boundary sections
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.policy.clone(), self.jitter, self.boundary)
    }

    /// Driver limits from the driver and publish sections
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            max_passes: self.driver.max_passes,
            query_retries: self.driver.query_retries,
            publish_retries: self.publish.retries,
            publish_ignore_errors: self.publish.ignore_errors,
        }
    }

    /// Since expression, falling back to the built-in default
    pub fn since(&self) -> &str {
        self.defaults.since.as_deref().unwrap_or(DEFAULT_SINCE)
    }
}

/// Load project configuration from the repository root.
///
/// Searches for `afterhours.toml` then `.afterhoursrc.json`, then the user
/// config. A file that fails to parse is logged and skipped.
pub fn load_project_config(repo_path: &Path) -> ProjectConfig {
    for name in PROJECT_CONFIG_FILES {
        let path = repo_path.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    if let Some(config) = super::user_config::load_user_config() {
        return config;
    }

    debug!("No config found, using defaults");
    ProjectConfig::default()
}

/// Load configuration from a TOML or JSON file, by extension
pub(crate) fn load_config_file(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let config = if is_json {
        serde_json::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };
    Ok(config)
}
