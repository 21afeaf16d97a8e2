//! Fixed-point driver: load, normalize, rewrite one commit, repeat
//!
//! Rewriting a commit changes the hash of every commit after it, so a fix list
//! is stale as soon as one fix is applied. The driver therefore applies only
//! the first fix of each pass, then reloads the ledger from the repository and
//! normalizes again. It stops when a pass proposes nothing.
//!
//! The repository is reached only through the [`LedgerSource`], [`Rewriter`]
//! and [`Publisher`] traits; the git-backed implementations live in
//! [`crate::git`].

use crate::error::{human_date, RetimeError, RetimeResult};
use crate::ledger::Ledger;
use crate::models::FixedCommit;
use crate::normalizer::{JitterSource, Normalizer};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Produces the commits in the configured range, oldest first.
pub trait LedgerSource {
    fn load(&self) -> RetimeResult<Ledger>;
}

/// Rewrites the dates of exactly one commit, identified by hash.
pub trait Rewriter {
    fn rewrite(
        &self,
        hash: &str,
        author_date: DateTime<FixedOffset>,
        committer_date: DateTime<FixedOffset>,
    ) -> RetimeResult<()>;
}

/// Force-publishes the current history.
pub trait Publisher {
    fn publish(&self) -> RetimeResult<()>;
}

/// Loop limits and failure handling for the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    /// Upper bound on normalization passes
    pub max_passes: usize,
    /// Extra attempts for a failed ledger query
    pub query_retries: usize,
    /// Extra attempts for a failed publish
    pub publish_retries: usize,
    /// Log publish failures instead of aborting
    pub publish_ignore_errors: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            max_passes: 1000,
            query_retries: 2,
            publish_retries: 0,
            publish_ignore_errors: true,
        }
    }
}

/// What one pass saw and proposed
#[derive(Debug)]
pub struct PassReport<'a> {
    /// 1-based pass number
    pub pass: usize,
    pub ledger: &'a Ledger,
    pub fixes: &'a [FixedCommit],
}

/// Outcome of a completed run
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub passes: usize,
    /// Fixes in the order they were applied (hashes as before each rewrite)
    pub applied: Vec<FixedCommit>,
}

pub struct FixedPointDriver<'a> {
    source: &'a dyn LedgerSource,
    rewriter: &'a dyn Rewriter,
    publisher: Option<&'a dyn Publisher>,
    normalizer: Normalizer,
    settings: DriverSettings,
    stop: Arc<AtomicBool>,
}

impl<'a> FixedPointDriver<'a> {
    pub fn new(
        source: &'a dyn LedgerSource,
        rewriter: &'a dyn Rewriter,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            source,
            rewriter,
            publisher: None,
            normalizer,
            settings: DriverSettings::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_publisher(mut self, publisher: &'a dyn Publisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Flag checked between passes; setting it ends the run with
    /// [`RetimeError::Interrupted`] before the next pass starts.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Load and normalize once without touching history.
    pub fn plan(&self, jitter: &mut dyn JitterSource) -> RetimeResult<(Ledger, Vec<FixedCommit>)> {
        let ledger = self.load_ledger()?;
        let fixes = self.normalizer.normalize(&ledger, jitter)?;
        Ok((ledger, fixes))
    }

    /// Run passes until one proposes no fixes.
    pub fn run(
        &self,
        jitter: &mut dyn JitterSource,
        mut on_pass: impl FnMut(&PassReport<'_>),
    ) -> RetimeResult<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            if self.stop.load(Ordering::SeqCst) {
                return Err(RetimeError::Interrupted {
                    passes: summary.passes,
                });
            }
            if summary.passes >= self.settings.max_passes {
                let last = summary.applied.last();
                return Err(RetimeError::MaxPassesExceeded {
                    max_passes: self.settings.max_passes,
                    hash: last.map(|f| f.commit.hash.clone()).unwrap_or_default(),
                    date: last
                        .map(|f| human_date(&f.author_date_fixed))
                        .unwrap_or_default(),
                });
            }
            summary.passes += 1;

            let ledger = self.load_ledger()?;
            let fixes = self.normalizer.normalize(&ledger, jitter)?;
            debug!(
                "Pass {}: {} commit(s), {} to fix",
                summary.passes,
                ledger.len(),
                fixes.len()
            );
            on_pass(&PassReport {
                pass: summary.passes,
                ledger: &ledger,
                fixes: &fixes,
            });

            let Some(fix) = fixes.into_iter().next() else {
                info!("History is clean after {} pass(es)", summary.passes);
                return Ok(summary);
            };

            self.apply(&fix.commit.hash, fix.author_date_fixed, fix.committer_date_fixed)?;
            summary.applied.push(fix);
        }
    }

    /// Rewrite one named commit to one date, bypassing the ledger entirely.
    pub fn fix_single(&self, hash: &str, date: DateTime<FixedOffset>) -> RetimeResult<()> {
        self.apply(hash, date, date)
    }

    fn apply(
        &self,
        hash: &str,
        author_date: DateTime<FixedOffset>,
        committer_date: DateTime<FixedOffset>,
    ) -> RetimeResult<()> {
        info!("Rewriting {} to {}", hash, human_date(&author_date));
        self.rewriter
            .rewrite(hash, author_date, committer_date)
            .map_err(|e| match e {
                e @ RetimeError::RewriteFailed { .. } => e,
                other => RetimeError::rewrite_failed(hash, &author_date, other.to_string()),
            })?;
        self.publish()
    }

    fn load_ledger(&self) -> RetimeResult<Ledger> {
        let attempts = self.settings.query_retries + 1;
        let mut attempt = 1;
        loop {
            match self.source.load() {
                Ok(ledger) => return Ok(ledger),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!("Loading commits failed (attempt {}/{}): {}", attempt, attempts, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn publish(&self) -> RetimeResult<()> {
        let Some(publisher) = self.publisher else {
            debug!("Publishing disabled");
            return Ok(());
        };

        let attempts = self.settings.publish_retries + 1;
        let mut last_error = None;
        for attempt in 1..=attempts {
            match publisher.publish() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("Publish failed (attempt {}/{}): {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !self.settings.publish_ignore_errors => Err(match e {
                e @ RetimeError::PublishFailed { .. } => e,
                other => RetimeError::publish_failed(other.to_string()),
            }),
            Some(e) => {
                warn!("Ignoring publish failure: {}", e);
                Ok(())
            }
            None => Ok(()),
        }
    }
}
