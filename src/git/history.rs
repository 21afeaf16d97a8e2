//! Commit ledger extraction using libgit2
//!
//! Lists the commits reachable from HEAD whose committer date is at or after
//! a lower bound, oldest first, keeping each signature's stored offset.

use crate::driver::LedgerSource;
use crate::error::{RetimeError, RetimeResult};
use crate::ledger::Ledger;
use crate::models::CommitRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, TimeZone};
use git2::{ErrorCode, Repository, Sort};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads commit history from a local repository.
pub struct GitHistory {
    path: PathBuf,
    since: Option<DateTime<FixedOffset>>,
}

impl GitHistory {
    /// Open a git repository.
    ///
    /// # Arguments
    /// * `path` - Path to the repository (or any subdirectory)
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("Failed to open git repository at {:?}", path))?;
        debug!("Opened git repository at {:?}", repo.path());
        let root = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();
        Ok(Self {
            path: root,
            since: None,
        })
    }

    /// Only list commits committed at or after `since`
    pub fn since(mut self, since: DateTime<FixedOffset>) -> Self {
        self.since = Some(since);
        self
    }

    /// Check if a path is inside a git repository.
    pub fn is_git_repo(path: &Path) -> bool {
        Repository::discover(path).is_ok()
    }

    /// Working directory (or git dir for bare repositories)
    pub fn repo_root(&self) -> &Path {
        &self.path
    }

    /// Commits in range, oldest first.
    pub fn commits(&self) -> Result<Vec<CommitRecord>> {
        // Reopened on every call: a rewrite since the last call moved HEAD
        let repo = Repository::open(&self.path)
            .with_context(|| format!("Failed to open git repository at {:?}", self.path))?;

        match repo.head() {
            Ok(_) => {}
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                debug!("Repository has no commits yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).context("Failed to resolve HEAD"),
        }

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME | Sort::REVERSE)?;
        revwalk.push_head()?;

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = repo.find_commit(oid)?;

            let committer_date = signature_date(&commit.committer())?;
            if self.since.is_some_and(|since| committer_date < since) {
                continue;
            }

            commits.push(extract_commit_record(&commit, committer_date)?);
        }

        debug!("Loaded {} commit(s) from {:?}", commits.len(), self.path);
        Ok(commits)
    }
}

impl LedgerSource for GitHistory {
    fn load(&self) -> RetimeResult<Ledger> {
        let commits = self
            .commits()
            .map_err(|e| RetimeError::source_unavailable(format!("{:#}", e)))?;
        Ledger::new(commits)
    }
}

/// Build a record from a git2 commit.
fn extract_commit_record(
    commit: &git2::Commit,
    committer_date: DateTime<FixedOffset>,
) -> Result<CommitRecord> {
    let author = commit.author();
    let message = commit
        .summary_bytes()
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .unwrap_or_default();

    Ok(CommitRecord {
        hash: commit.id().to_string(),
        author_name: String::from_utf8_lossy(author.name_bytes()).into_owned(),
        author_email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
        author_date: signature_date(&author)?,
        committer_date,
        message,
    })
}

/// Signature time in the offset it was recorded with.
pub(crate) fn signature_date(sig: &git2::Signature) -> Result<DateTime<FixedOffset>> {
    let when = sig.when();
    let offset = FixedOffset::east_opt(when.offset_minutes() * 60)
        .with_context(|| format!("Invalid timezone offset {} minutes", when.offset_minutes()))?;
    offset
        .timestamp_opt(when.seconds(), 0)
        .single()
        .with_context(|| format!("Invalid commit timestamp {}", when.seconds()))
}

/// Convert a date to a libgit2 time, keeping its offset.
pub(crate) fn git_time(date: &DateTime<FixedOffset>) -> git2::Time {
    git2::Time::new(date.timestamp(), date.offset().local_minus_utc() / 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::test_support::commit_at;
    use git2::Signature;
    use tempfile::tempdir;

    #[test]
    fn test_open_repo() -> Result<()> {
        let dir = tempdir()?;
        Repository::init(dir.path())?;
        let history = GitHistory::open(dir.path())?;
        assert!(history.repo_root().exists());
        assert!(GitHistory::is_git_repo(dir.path()));

        let non_repo = tempdir()?;
        assert!(!GitHistory::is_git_repo(non_repo.path()));
        Ok(())
    }

    #[test]
    fn test_empty_repository_gives_empty_ledger() -> Result<()> {
        let dir = tempdir()?;
        Repository::init(dir.path())?;
        let ledger = GitHistory::open(dir.path())?.load()?;
        assert!(ledger.is_empty());
        Ok(())
    }

    #[test]
    fn test_commits_oldest_first_with_offsets() -> Result<()> {
        let dir = tempdir()?;
        let repo = Repository::init(dir.path())?;
        // 2024-06-03 08:00 UTC, then 09:00 UTC recorded in UTC+02:00
        let first = commit_at(&repo, "first", 1_717_401_600, 0)?;
        let second = commit_at(&repo, "second\n\nbody text", 1_717_401_600 + 3600, 120)?;

        let ledger = GitHistory::open(dir.path())?.load()?;
        assert_eq!(ledger.len(), 2);
        let records = ledger.records();
        assert_eq!(records[0].hash, first.to_string());
        assert_eq!(records[1].hash, second.to_string());
        assert_eq!(records[1].message, "second");
        assert_eq!(records[1].author_name, "Test User");
        assert_eq!(records[1].author_date.to_rfc3339(), "2024-06-03T11:00:00+02:00");
        Ok(())
    }

    #[test]
    fn test_since_filters_on_committer_date() -> Result<()> {
        let dir = tempdir()?;
        let repo = Repository::init(dir.path())?;
        commit_at(&repo, "old", 1_700_000_000, 0)?;
        let recent = commit_at(&repo, "recent", 1_717_401_600, 0)?;

        let since = DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00")?;
        let ledger = GitHistory::open(dir.path())?.since(since).load()?;
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.records()[0].hash, recent.to_string());
        Ok(())
    }

    #[test]
    fn test_git_time_round_trips_offset() -> Result<()> {
        let date = DateTime::parse_from_rfc3339("2024-06-03T22:15:00-03:30")?;
        let time = git_time(&date);
        assert_eq!(time.offset_minutes(), -210);
        let sig = Signature::new("a", "a@example.com", &time)?;
        assert_eq!(signature_date(&sig)?, date);
        Ok(())
    }
}
