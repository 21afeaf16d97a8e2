//! Ordered, validated sequence of commits loaded for one normalization pass

use crate::error::{RetimeError, RetimeResult};
use crate::models::CommitRecord;
use std::collections::HashSet;

/// Commits in the queried range, oldest first.
///
/// The order is the order the source produced and is never re-sorted. A ledger
/// is rebuilt from the repository after every rewrite because rewriting a
/// commit changes the hash of everything after it.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    records: Vec<CommitRecord>,
}

impl Ledger {
    /// Build a ledger, rejecting malformed or duplicate hashes.
    pub fn new(records: Vec<CommitRecord>) -> RetimeResult<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if !is_valid_hash(&record.hash) {
                return Err(RetimeError::source_unavailable(format!(
                    "malformed commit hash {:?} at index {}",
                    record.hash, index
                )));
            }
            if !seen.insert(record.hash.as_str()) {
                return Err(RetimeError::source_unavailable(format!(
                    "duplicate commit {} at index {}",
                    record.hash, index
                )));
            }
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CommitRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommitRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[CommitRecord] {
        &self.records
    }

    /// Index of the commit with this hash, if present
    pub fn position(&self, hash: &str) -> Option<usize> {
        self.records.iter().position(|r| r.hash == hash)
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a CommitRecord;
    type IntoIter = std::slice::Iter<'a, CommitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Object ids are hex, abbreviated ones included (SHA-1 or SHA-256)
fn is_valid_hash(hash: &str) -> bool {
    (4..=64).contains(&hash.len()) && hash.bytes().all(|b| b.is_ascii_hexdigit())
}
