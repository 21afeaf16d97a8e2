//! Core data models for commits and proposed date fixes

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// One commit as observed when the ledger was queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    /// Full commit hash
    pub hash: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author date, in the offset stored in the commit
    pub author_date: DateTime<FixedOffset>,
    /// Committer date, in the offset stored in the commit
    pub committer_date: DateTime<FixedOffset>,
    /// Commit message (first line)
    pub message: String,
}

impl CommitRecord {
    /// Abbreviated hash for display
    pub fn short_hash(&self) -> &str {
        let end = self.hash.len().min(7);
        &self.hash[..end]
    }
}

/// A commit together with the dates it should be moved to.
///
/// Author and committer proposals are always equal. `anchor` is the earlier
/// date the proposal was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixedCommit {
    #[serde(flatten)]
    pub commit: CommitRecord,
    pub anchor: DateTime<FixedOffset>,
    pub author_date_fixed: DateTime<FixedOffset>,
    pub committer_date_fixed: DateTime<FixedOffset>,
}

impl FixedCommit {
    pub fn new(
        commit: CommitRecord,
        anchor: DateTime<FixedOffset>,
        proposed: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            commit,
            anchor,
            author_date_fixed: proposed,
            committer_date_fixed: proposed,
        }
    }

    pub fn hash(&self) -> &str {
        &self.commit.hash
    }

    /// Distance between the proposal and its anchor
    pub fn jitter(&self) -> chrono::Duration {
        self.author_date_fixed - self.anchor
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a record whose author and committer dates are both `date` (RFC 3339)
    pub(crate) fn record(hash: &str, date: &str) -> CommitRecord {
        let when = DateTime::parse_from_rfc3339(date).expect("valid RFC 3339 date");
        CommitRecord {
            hash: hash.to_string(),
            author_name: "Test User".into(),
            author_email: "test@example.com".into(),
            author_date: when,
            committer_date: when,
            message: format!("commit {hash}"),
        }
    }

    #[test]
    fn test_short_hash() {
        let r = record("0123456789abcdef", "2024-06-03T08:00:00+00:00");
        assert_eq!(r.short_hash(), "0123456");
        let r = record("abc", "2024-06-03T08:00:00+00:00");
        assert_eq!(r.short_hash(), "abc");
    }

    #[test]
    fn test_fixed_commit_sets_both_dates() {
        let r = record("aaaa", "2024-06-03T10:00:00+00:00");
        let anchor = DateTime::parse_from_rfc3339("2024-06-03T08:00:00+00:00").unwrap();
        let proposed = anchor + chrono::Duration::seconds(25);
        let fixed = FixedCommit::new(r.clone(), anchor, proposed);
        assert_eq!(fixed.author_date_fixed, fixed.committer_date_fixed);
        assert_eq!(fixed.jitter(), chrono::Duration::seconds(25));
        // The original record is carried unchanged
        assert_eq!(fixed.commit, r);
    }

    #[test]
    fn test_fixed_commit_serializes_flat() {
        let r = record("bbbb", "2024-06-03T10:00:00+02:00");
        let fixed = FixedCommit::new(r.clone(), r.author_date, r.author_date);
        let v = serde_json::to_value(&fixed).unwrap();
        assert_eq!(v["hash"], "bbbb");
        assert_eq!(v["author_date"], "2024-06-03T10:00:00+02:00");
        assert!(v.get("author_date_fixed").is_some());
    }
}
