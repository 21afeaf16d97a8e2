//! Init command - write an afterhours.toml template

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Template written by `afterhours init`. Every value matches the built-in
/// default.
pub(crate) const CONFIG_TEMPLATE: &str = r#"# afterhours configuration
# Commits whose author date falls inside the window below are moved to a few
# seconds after the closest earlier commit made outside it.

# First commit in range is inside the window: "skip" (warn) or "abort"
boundary = "skip"

[policy]
weekdays = ["mon", "tue", "wed", "thu", "fri"]
start_hour = 9
# Inclusive: 18 means 18:59:59 is still disallowed
end_hour = 18

[jitter]
# Seconds added after the anchor date
min_secs = 10
max_secs = 50

[driver]
max_passes = 1000
query_retries = 2

[rewrite]
# "native" (libgit2) or "filter-branch"
backend = "native"
# Only used by filter-branch (0 = no timeout)
timeout_secs = 600

[publish]
# Force-push after every rewrite (the CLI flag --no-push disables it)
enabled = true
# remote = "origin"
# branch = "main"
timeout_secs = 120
retries = 0
ignore_errors = true

[defaults]
# since = "2.weeks"
# format = "text"
# seed = 42
"#;

/// Run the init command
pub fn run(path: &Path) -> Result<()> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !repo_path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", repo_path.display());
    }

    let config_path = repo_path.join("afterhours.toml");
    if config_path.exists() {
        println!(
            "{} Already initialized at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to create {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!(
        "\nPreview fixes with: {}",
        style("afterhours run").cyan()
    );
    Ok(())
}
