//! JSON reporter
//!
//! Outputs the full report as pretty-printed JSON, with RFC 3339 dates.

use super::RetimeReport;
use anyhow::Result;

/// Render report as JSON
pub fn render(report: &RetimeReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
