//! Git-backed collaborators for the fixed-point driver
//!
//! - [`GitHistory`] lists the commits in range (libgit2)
//! - [`NativeRewriter`] re-creates a commit and its descendants with new
//!   dates (libgit2), [`FilterBranchRewriter`] does the same through
//!   `git filter-branch`
//! - [`GitPublisher`] force-pushes the rewritten branch
//!
//! # Example
//!
//! ```no_run
//! use afterhours::driver::LedgerSource;
//! use afterhours::git::GitHistory;
//! use std::path::Path;
//!
//! let history = GitHistory::open(Path::new("/path/to/repo")).unwrap();
//! let ledger = history.load().unwrap();
//! println!("{} commit(s)", ledger.len());
//! ```

pub mod command;
pub mod history;
pub mod publish;
pub mod rewrite;

pub use command::{CommandError, CommandOutput, CommandRunner};
pub use history::GitHistory;
pub use publish::GitPublisher;
pub use rewrite::{FilterBranchRewriter, NativeRewriter, RewriteBackend};

#[cfg(test)]
pub(crate) mod test_support {
    use anyhow::{Context, Result};
    use git2::{Repository, Signature, Time};
    use std::path::Path;

    /// Commit a change to `test.txt` on top of HEAD with the given time.
    pub fn commit_at(
        repo: &Repository,
        message: &str,
        secs: i64,
        offset_minutes: i32,
    ) -> Result<git2::Oid> {
        let sig = Signature::new(
            "Test User",
            "test@example.com",
            &Time::new(secs, offset_minutes),
        )?;
        let tree_id = {
            let mut index = repo.index()?;
            let workdir = repo.workdir().context("bare repository")?;
            std::fs::write(workdir.join("test.txt"), message)?;
            index.add_path(Path::new("test.txt"))?;
            index.write()?;
            index.write_tree()?
        };
        let tree = repo.find_tree(tree_id)?;
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit()?],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        Ok(repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?)
    }

    /// Whether a `git` binary is on PATH
    pub fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
