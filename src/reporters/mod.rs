//! Output reporters for retiming plans and results
//!
//! Supports two output formats:
//! - `text` - Terminal table (hash, message, date, fixed date)
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::models::FixedCommit;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "table" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Whether history was rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    DryRun,
    Apply,
}

/// What a run planned or did
#[derive(Debug, Clone, Serialize)]
pub struct RetimeReport {
    pub mode: RunMode,
    /// The since expression the range was built from
    pub since: String,
    /// Commits in range when the run started
    pub commits: usize,
    pub passes: usize,
    /// Planned fixes (dry run) or applied fixes, hashes as first seen
    pub fixes: Vec<FixedCommit>,
}

/// Render a report in the specified format
pub fn report(report: &RetimeReport, format: &str) -> Result<String> {
    let fmt = OutputFormat::from_str(format)?;
    report_with_format(report, fmt)
}

/// Render a report using an OutputFormat enum
pub fn report_with_format(report: &RetimeReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(report),
        OutputFormat::Json => json::render(report),
    }
}
