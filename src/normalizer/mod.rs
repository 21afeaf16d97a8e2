//! Commit date normalization
//!
//! Walks a [`Ledger`] oldest-first and proposes a new date for every commit
//! whose author date falls inside the disallowed [`TimeWindow`]. A proposal is
//! the closest earlier acceptable date plus a small random jitter, so fixed
//! commits keep their order without all landing on the same second.
//!
//! Consecutive disallowed commits chain: the anchor for one commit is the
//! proposal already computed for the commit before it.
//!
//! A proposal that lands inside the window itself (an anchor a few seconds
//! before `start_hour`) fails the pass with
//! [`RetimeError::ProposalInWindow`] before anything is rewritten.

mod jitter;

pub use jitter::{FixedJitter, JitterRange, JitterSource, RandomJitter};

use crate::error::{human_date, RetimeError, RetimeResult};
use crate::ledger::Ledger;
use crate::models::FixedCommit;
use crate::policy::TimeWindow;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// What to do with a disallowed commit at index 0, which has no earlier date
/// to anchor to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// Leave it untouched and log a warning (default)
    #[default]
    Skip,
    /// Fail the pass with [`RetimeError::BoundaryUnfixable`]
    Abort,
}

impl std::str::FromStr for BoundaryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" | "warn" => Ok(BoundaryPolicy::Skip),
            "abort" | "error" => Ok(BoundaryPolicy::Abort),
            _ => Err(format!("Unknown boundary policy '{}'. Valid: skip, abort", s)),
        }
    }
}

/// Computes date fixes for one ledger pass.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    window: TimeWindow,
    jitter: JitterRange,
    boundary: BoundaryPolicy,
}

impl Normalizer {
    pub fn new(window: TimeWindow, jitter: JitterRange, boundary: BoundaryPolicy) -> Self {
        Self {
            window,
            jitter,
            boundary,
        }
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn jitter_range(&self) -> JitterRange {
        self.jitter
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    /// Propose new dates for every disallowed commit, in ledger order.
    pub fn normalize(
        &self,
        ledger: &Ledger,
        rng: &mut dyn JitterSource,
    ) -> RetimeResult<Vec<FixedCommit>> {
        let mut proposals: HashMap<&str, DateTime<FixedOffset>> = HashMap::new();
        let mut fixes = Vec::new();

        for (index, record) in ledger.iter().enumerate() {
            if !self.window.is_disallowed(&record.author_date) {
                continue;
            }

            if index == 0 {
                match self.boundary {
                    BoundaryPolicy::Skip => {
                        warn!(
                            "Commit {} will not be modified: no earlier commit in range to anchor its date to",
                            record.hash
                        );
                        continue;
                    }
                    BoundaryPolicy::Abort => {
                        return Err(RetimeError::BoundaryUnfixable {
                            hash: record.hash.clone(),
                            date: human_date(&record.author_date),
                        });
                    }
                }
            }

            let anchor = self.previous_allowed_date(ledger, index, &proposals)?;
            let proposed = anchor + rng.next_jitter(&self.jitter);

            // The next pass would flag it again
            if self.window.is_disallowed(&proposed) {
                return Err(RetimeError::ProposalInWindow {
                    hash: record.hash.clone(),
                    date: human_date(&record.author_date),
                    proposed: human_date(&proposed),
                });
            }
            debug!(
                "{}: {} -> {} (anchor {})",
                record.short_hash(),
                human_date(&record.author_date),
                human_date(&proposed),
                human_date(&anchor)
            );

            proposals.insert(record.hash.as_str(), proposed);
            fixes.push(FixedCommit::new(record.clone(), anchor, proposed));
        }

        Ok(fixes)
    }

    /// Closest date before `index` that is either already fixed in this pass
    /// or allowed as-is. `index` must be greater than zero.
    pub fn previous_allowed_date(
        &self,
        ledger: &Ledger,
        index: usize,
        proposals: &HashMap<&str, DateTime<FixedOffset>>,
    ) -> RetimeResult<DateTime<FixedOffset>> {
        let upto = index.min(ledger.len());
        for record in ledger.records()[..upto].iter().rev() {
            if let Some(proposed) = proposals.get(record.hash.as_str()) {
                return Ok(*proposed);
            }
            if !self.window.is_disallowed(&record.author_date) {
                return Ok(record.author_date);
            }
        }

        let record = ledger.get(index);
        Err(RetimeError::AnchorNotFound {
            hash: record.map(|r| r.hash.clone()).unwrap_or_default(),
            date: record.map(|r| human_date(&r.author_date)).unwrap_or_default(),
            index,
        })
    }
}
