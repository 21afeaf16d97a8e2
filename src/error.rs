//! Error taxonomy for ledger loading, normalization and history rewriting

use chrono::{DateTime, FixedOffset};
use thiserror::Error;

/// Errors that can occur while retiming commits
#[derive(Error, Debug)]
pub enum RetimeError {
    #[error("Commit source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("Commit {hash} ({date}) is the first commit in range and has no earlier date to anchor to")]
    BoundaryUnfixable { hash: String, date: String },

    #[error("No previous allowed commit found for {hash} ({date}, index {index})")]
    AnchorNotFound {
        hash: String,
        date: String,
        index: usize,
    },

    #[error("Rewrite of commit {hash} ({date}) failed: {reason}")]
    RewriteFailed {
        hash: String,
        date: String,
        reason: String,
    },

    #[error("Publish failed: {reason}")]
    PublishFailed { reason: String },

    #[error("Proposed date {proposed} for commit {hash} ({date}) is still inside the disallowed window")]
    ProposalInWindow {
        hash: String,
        date: String,
        proposed: String,
    },

    #[error("History still has commits to fix after {max_passes} passes (last rewrite: {hash} to {date})")]
    MaxPassesExceeded {
        max_passes: usize,
        hash: String,
        date: String,
    },

    #[error("Interrupted after {passes} pass(es)")]
    Interrupted { passes: usize },

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}

impl RetimeError {
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        RetimeError::SourceUnavailable {
            reason: reason.into(),
        }
    }

    pub fn rewrite_failed(
        hash: &str,
        date: &DateTime<FixedOffset>,
        reason: impl Into<String>,
    ) -> Self {
        RetimeError::RewriteFailed {
            hash: hash.to_string(),
            date: human_date(date),
            reason: reason.into(),
        }
    }

    pub fn publish_failed(reason: impl Into<String>) -> Self {
        RetimeError::PublishFailed {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only ledger queries and publishing are retried. A rewrite that failed
    /// half-way must never be replayed against the same history.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetimeError::SourceUnavailable { .. } | RetimeError::PublishFailed { .. }
        )
    }
}

pub type RetimeResult<T> = Result<T, RetimeError>;

/// Format a commit date for messages and tables, e.g. `Mon  3 Jun 10:05:00`.
pub fn human_date(date: &DateTime<FixedOffset>) -> String {
    date.format("%a %e %b %H:%M:%S").to_string()
}
