//! Random offsets added to anchor dates

use crate::error::{RetimeError, RetimeResult};
use chrono::Duration;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Closed range of seconds added to an anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for JitterRange {
    fn default() -> Self {
        Self {
            min_secs: 10,
            max_secs: 50,
        }
    }
}

impl JitterRange {
    pub fn new(min_secs: u64, max_secs: u64) -> RetimeResult<Self> {
        let range = Self { min_secs, max_secs };
        range.validate()?;
        Ok(range)
    }

    /// A zero minimum would let a fixed commit share its anchor's second.
    pub fn validate(&self) -> RetimeResult<()> {
        if self.min_secs == 0 {
            return Err(RetimeError::InvalidPolicy(
                "jitter min_secs must be at least 1".into(),
            ));
        }
        if self.min_secs > self.max_secs {
            return Err(RetimeError::InvalidPolicy(format!(
                "jitter min_secs {} is greater than max_secs {}",
                self.min_secs, self.max_secs
            )));
        }
        Ok(())
    }

    pub fn contains(&self, jitter: Duration) -> bool {
        let secs = jitter.num_seconds();
        secs >= self.min_secs as i64 && secs <= self.max_secs as i64
    }
}

/// Source of jitter durations, injected so tests can pin the sequence.
pub trait JitterSource {
    /// Next offset; must lie within `range`.
    fn next_jitter(&mut self, range: &JitterRange) -> Duration;
}

/// Uniformly random jitter backed by any [`rand::Rng`].
#[derive(Debug, Clone)]
pub struct RandomJitter<R> {
    rng: R,
}

impl<R: Rng> RandomJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomJitter<ChaCha8Rng> {
    /// Reproducible jitter for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Jitter seeded from the operating system
    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_os_rng())
    }
}

impl<R: Rng> JitterSource for RandomJitter<R> {
    fn next_jitter(&mut self, range: &JitterRange) -> Duration {
        let secs = self.rng.random_range(range.min_secs..=range.max_secs);
        Duration::seconds(secs as i64)
    }
}

/// Replays a fixed list of second offsets, cycling when exhausted.
///
/// Values outside the requested range are clamped into it.
#[derive(Debug, Clone)]
pub struct FixedJitter {
    secs: Vec<u64>,
    next: usize,
}

impl FixedJitter {
    pub fn new(secs: Vec<u64>) -> Self {
        Self { secs, next: 0 }
    }

    /// How many offsets have been handed out
    pub fn drawn(&self) -> usize {
        self.next
    }
}

impl JitterSource for FixedJitter {
    fn next_jitter(&mut self, range: &JitterRange) -> Duration {
        let raw = if self.secs.is_empty() {
            range.min_secs
        } else {
            self.secs[self.next % self.secs.len()]
        };
        self.next += 1;
        Duration::seconds(raw.clamp(range.min_secs, range.max_secs) as i64)
    }
}
