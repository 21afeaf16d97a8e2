//! Rewriting the dates of a single commit
//!
//! Both backends give the target commit new author and committer dates and
//! re-create every descendant on the current branch so it points at the new
//! parents. Trees, messages and identities are kept.

use super::command::{CommandError, CommandRunner};
use super::history::git_time;
use crate::driver::Rewriter;
use crate::error::{RetimeError, RetimeResult};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use git2::{Oid, Repository, Signature, Sort};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Which implementation rewrites history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteBackend {
    /// In-process, through libgit2
    #[default]
    Native,
    /// `git filter-branch --env-filter`
    FilterBranch,
}

impl RewriteBackend {
    /// Build the rewriter for a repository.
    ///
    /// `timeout_secs` only applies to backends that spawn processes.
    pub fn build(self, repo_path: &Path, timeout_secs: u64) -> Box<dyn Rewriter> {
        match self {
            RewriteBackend::Native => Box::new(NativeRewriter::new(repo_path)),
            RewriteBackend::FilterBranch => {
                Box::new(FilterBranchRewriter::new(repo_path, timeout_secs))
            }
        }
    }
}

impl FromStr for RewriteBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" | "libgit2" => Ok(RewriteBackend::Native),
            "filter-branch" | "filterbranch" => Ok(RewriteBackend::FilterBranch),
            _ => Err(format!(
                "Unknown rewrite backend '{}'. Valid: native, filter-branch",
                s
            )),
        }
    }
}

impl fmt::Display for RewriteBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteBackend::Native => write!(f, "native"),
            RewriteBackend::FilterBranch => write!(f, "filter-branch"),
        }
    }
}

/// Rewrites history in-process with libgit2.
pub struct NativeRewriter {
    path: PathBuf,
}

impl NativeRewriter {
    pub fn new(repo_path: &Path) -> Self {
        Self {
            path: repo_path.to_path_buf(),
        }
    }

    fn rewrite_commit(
        &self,
        hash: &str,
        author_date: &DateTime<FixedOffset>,
        committer_date: &DateTime<FixedOffset>,
    ) -> Result<Oid> {
        let repo = Repository::open(&self.path)
            .with_context(|| format!("Failed to open git repository at {:?}", self.path))?;

        let target = repo
            .revparse_single(hash)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("Unknown commit {}", hash))?;
        let head = repo.head().context("HEAD does not point at a commit")?;
        let head_id = head.peel_to_commit()?.id();

        if head_id != target.id() && !repo.graph_descendant_of(head_id, target.id())? {
            bail!("Commit {} is not an ancestor of HEAD", target.id());
        }

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        revwalk.push(head_id)?;
        for parent in target.parent_ids() {
            revwalk.hide(parent)?;
        }

        // Old id -> new id for every commit that had to be re-created
        let mut remap: HashMap<Oid, Oid> = HashMap::new();
        for oid in revwalk {
            let oid = oid?;
            let is_target = oid == target.id();
            let commit = repo.find_commit(oid)?;
            if !is_target && !commit.parent_ids().any(|p| remap.contains_key(&p)) {
                continue;
            }

            let parents = commit
                .parent_ids()
                .map(|p| repo.find_commit(remap.get(&p).copied().unwrap_or(p)))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

            let (author, committer) = if is_target {
                (
                    redate(&commit.author(), author_date)?,
                    redate(&commit.committer(), committer_date)?,
                )
            } else {
                (commit.author().to_owned(), commit.committer().to_owned())
            };
            let message = commit
                .message_raw()
                .with_context(|| format!("Commit {} has a non UTF-8 message", oid))?;

            let new_id = repo.commit(
                None,
                &author,
                &committer,
                message,
                &commit.tree()?,
                &parent_refs,
            )?;
            debug!("Re-created {} as {}", oid, new_id);
            remap.insert(oid, new_id);
        }

        let new_head = remap
            .get(&head_id)
            .copied()
            .context("HEAD was not re-created")?;
        let reflog = format!("afterhours: retime {}", target.id());
        if head.is_branch() {
            let name = head.name().context("Branch name is not valid UTF-8")?;
            repo.reference(name, new_head, true, &reflog)?;
        } else {
            repo.set_head_detached(new_head)?;
        }

        info!(
            "Rewrote {} commit(s); HEAD is now {}",
            remap.len(),
            new_head
        );
        Ok(new_head)
    }
}

impl Rewriter for NativeRewriter {
    fn rewrite(
        &self,
        hash: &str,
        author_date: DateTime<FixedOffset>,
        committer_date: DateTime<FixedOffset>,
    ) -> RetimeResult<()> {
        self.rewrite_commit(hash, &author_date, &committer_date)
            .map(|_| ())
            .map_err(|e| RetimeError::rewrite_failed(hash, &author_date, format!("{:#}", e)))
    }
}

/// Same identity, new time.
fn redate(sig: &Signature, date: &DateTime<FixedOffset>) -> Result<Signature<'static>> {
    let name = String::from_utf8_lossy(sig.name_bytes());
    let email = String::from_utf8_lossy(sig.email_bytes());
    Signature::new(&name, &email, &git_time(date))
        .with_context(|| format!("Invalid signature for {} <{}>", name, email))
}

/// Rewrites history by shelling out to `git filter-branch`.
pub struct FilterBranchRewriter {
    runner: CommandRunner,
}

impl FilterBranchRewriter {
    pub fn new(repo_path: &Path, timeout_secs: u64) -> Self {
        Self {
            runner: CommandRunner::new(repo_path)
                .with_timeout_secs(timeout_secs)
                .with_env("FILTER_BRANCH_SQUELCH_WARNING", "1"),
        }
    }

    fn resolve(&self, hash: &str) -> Result<String, CommandError> {
        let spec = format!("{}^{{commit}}", hash);
        let out = self
            .runner
            .run_checked("git", &["rev-parse", "--verify", &spec], false)?;
        Ok(out.trim().to_string())
    }

    fn has_parent(&self, full_hash: &str) -> Result<bool, CommandError> {
        let spec = format!("{}^", full_hash);
        let out = self
            .runner
            .run("git", &["rev-parse", "--verify", "--quiet", &spec])?;
        Ok(out.success())
    }
}

impl Rewriter for FilterBranchRewriter {
    fn rewrite(
        &self,
        hash: &str,
        author_date: DateTime<FixedOffset>,
        committer_date: DateTime<FixedOffset>,
    ) -> RetimeResult<()> {
        let fail = |e: CommandError| RetimeError::rewrite_failed(hash, &author_date, e.to_string());

        let full = self.resolve(hash).map_err(fail)?;
        let range = if self.has_parent(&full).map_err(fail)? {
            format!("{}^..HEAD", full)
        } else {
            "HEAD".to_string()
        };
        let filter = env_filter(&full, &author_date, &committer_date);

        self.runner
            .run_checked(
                "git",
                &["filter-branch", "-f", "--env-filter", &filter, "--", &range],
                false,
            )
            .map_err(fail)?;
        info!("filter-branch rewrote {} ({})", full, range);
        Ok(())
    }
}

/// Shell snippet that swaps the dates of one commit.
fn env_filter(
    full_hash: &str,
    author_date: &DateTime<FixedOffset>,
    committer_date: &DateTime<FixedOffset>,
) -> String {
    format!(
        "if [ \"$GIT_COMMIT\" = \"{hash}\" ]; then \
         export GIT_AUTHOR_DATE=\"{author}\"; \
         export GIT_COMMITTER_DATE=\"{committer}\"; \
         fi",
        hash = full_hash,
        author = raw_git_date(author_date),
        committer = raw_git_date(committer_date),
    )
}

/// `@<epoch> <+zzzz>`, git's unambiguous date form
fn raw_git_date(date: &DateTime<FixedOffset>) -> String {
    format!("@{} {}", date.timestamp(), date.format("%z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::history::{signature_date, GitHistory};
    use crate::git::test_support::{commit_at, git_available};
    use crate::driver::LedgerSource;
    use tempfile::tempdir;

    const MONDAY_8AM: i64 = 1_717_401_600; // 2024-06-03T08:00:00Z

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn three_commit_repo() -> Result<(tempfile::TempDir, Repository, Vec<Oid>)> {
        let dir = tempdir()?;
        let repo = Repository::init(dir.path())?;
        let ids = vec![
            commit_at(&repo, "first", MONDAY_8AM, 0)?,
            commit_at(&repo, "second", MONDAY_8AM + 7200, 0)?,
            commit_at(&repo, "third", MONDAY_8AM + 7500, 0)?,
        ];
        Ok((dir, repo, ids))
    }

    #[test]
    fn test_native_rewrites_target_and_reparents_descendants() -> Result<()> {
        let (dir, repo, ids) = three_commit_repo()?;
        let new_date = at("2024-06-03T10:00:30+02:00");

        NativeRewriter::new(dir.path()).rewrite(&ids[1].to_string(), new_date, new_date)?;

        let records = GitHistory::open(dir.path())?.load()?;
        let records = records.records();
        assert_eq!(records.len(), 3);
        // Ancestors untouched
        assert_eq!(records[0].hash, ids[0].to_string());
        // Target and descendant re-created
        assert_ne!(records[1].hash, ids[1].to_string());
        assert_ne!(records[2].hash, ids[2].to_string());
        assert_eq!(records[1].author_date, new_date);
        assert_eq!(records[1].committer_date, new_date);
        assert_eq!(records[1].author_date.offset().local_minus_utc(), 7200);
        assert_eq!(records[1].message, "second");
        assert_eq!(records[2].message, "third");
        assert_eq!(records[2].author_date.timestamp(), MONDAY_8AM + 7500);

        let old_tip = repo.find_commit(ids[2])?;
        let new_tip = repo.head()?.peel_to_commit()?;
        assert_eq!(old_tip.tree_id(), new_tip.tree_id());
        assert_eq!(new_tip.parent_id(0)?.to_string(), records[1].hash);
        Ok(())
    }

    #[test]
    fn test_native_rewrites_root_commit() -> Result<()> {
        let (dir, repo, ids) = three_commit_repo()?;
        let new_date = at("2024-06-02T23:00:00+00:00");
        NativeRewriter::new(dir.path()).rewrite(&ids[0].to_string(), new_date, new_date)?;

        let head = repo.head()?.peel_to_commit()?;
        let mut commit = head;
        while commit.parent_count() > 0 {
            commit = commit.parent(0)?;
        }
        assert_ne!(commit.id(), ids[0]);
        assert_eq!(signature_date(&commit.author())?, new_date);
        assert_eq!(commit.author().name(), Some("Test User"));
        Ok(())
    }

    #[test]
    fn test_native_accepts_abbreviated_hash() -> Result<()> {
        let (dir, repo, ids) = three_commit_repo()?;
        let short = &ids[2].to_string()[..7];
        let new_date = at("2024-06-03T20:00:00+00:00");
        NativeRewriter::new(dir.path()).rewrite(short, new_date, new_date)?;

        let head = repo.head()?.peel_to_commit()?;
        assert_eq!(signature_date(&head.author())?, new_date);
        assert_eq!(head.parent_id(0)?, ids[1]);
        Ok(())
    }

    #[test]
    fn test_native_unknown_commit_fails() -> Result<()> {
        let (dir, _repo, _ids) = three_commit_repo()?;
        let date = at("2024-06-03T20:00:00+00:00");
        let err = NativeRewriter::new(dir.path())
            .rewrite("deadbeefdeadbeef", date, date)
            .unwrap_err();
        match err {
            RetimeError::RewriteFailed { hash, reason, .. } => {
                assert_eq!(hash, "deadbeefdeadbeef");
                assert!(reason.contains("Unknown commit"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_env_filter_uses_raw_dates() {
        let author = at("2024-06-03T08:00:30+02:00");
        let committer = at("2024-06-03T08:00:30-05:30");
        let filter = env_filter("abc123", &author, &committer);
        assert!(filter.contains("\"$GIT_COMMIT\" = \"abc123\""));
        assert!(filter.contains(&format!("GIT_AUTHOR_DATE=\"@{} +0200\"", author.timestamp())));
        assert!(filter.contains(&format!(
            "GIT_COMMITTER_DATE=\"@{} -0530\"",
            committer.timestamp()
        )));
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("native".parse::<RewriteBackend>(), Ok(RewriteBackend::Native));
        assert_eq!(
            "Filter-Branch".parse::<RewriteBackend>(),
            Ok(RewriteBackend::FilterBranch)
        );
        assert!("rebase".parse::<RewriteBackend>().is_err());
        assert_eq!(RewriteBackend::FilterBranch.to_string(), "filter-branch");
    }

    #[test]
    fn test_filter_branch_rewrites_commit() -> Result<()> {
        if !git_available() {
            eprintln!("git not on PATH; skipping");
            return Ok(());
        }
        let (dir, repo, ids) = three_commit_repo()?;
        let new_date = at("2024-06-03T08:00:40+00:00");

        FilterBranchRewriter::new(dir.path(), 120).rewrite(
            &ids[1].to_string(),
            new_date,
            new_date,
        )?;

        let head = repo.head()?.peel_to_commit()?;
        let middle = head.parent(0)?;
        assert_eq!(signature_date(&middle.author())?, new_date);
        assert_eq!(signature_date(&middle.committer())?, new_date);
        assert_eq!(middle.parent_id(0)?, ids[0]);
        assert_eq!(middle.summary(), Some("second"));
        Ok(())
    }
}
