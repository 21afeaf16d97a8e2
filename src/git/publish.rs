//! Force-pushing rewritten history

use super::command::CommandRunner;
use crate::driver::Publisher;
use crate::error::{RetimeError, RetimeResult};
use std::path::Path;
use tracing::info;

/// Runs `git push --force [remote [branch]]`.
pub struct GitPublisher {
    runner: CommandRunner,
    remote: Option<String>,
    branch: Option<String>,
}

impl GitPublisher {
    pub fn new(repo_path: &Path, timeout_secs: u64) -> Self {
        Self {
            runner: CommandRunner::new(repo_path).with_timeout_secs(timeout_secs),
            remote: None,
            branch: None,
        }
    }

    /// Push to this remote instead of the branch's upstream
    pub fn with_remote(mut self, remote: Option<String>) -> Self {
        self.remote = remote;
        self
    }

    /// Push this branch (only used together with a remote)
    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    fn args(&self) -> Vec<&str> {
        let mut args = vec!["push", "--force"];
        if let Some(remote) = &self.remote {
            args.push(remote);
            if let Some(branch) = &self.branch {
                args.push(branch);
            }
        }
        args
    }
}

impl Publisher for GitPublisher {
    fn publish(&self) -> RetimeResult<()> {
        let args = self.args();
        self.runner
            .run_checked("git", &args, false)
            .map_err(|e| RetimeError::publish_failed(e.to_string()))?;
        info!("Pushed rewritten history ({})", args.join(" "));
        Ok(())
    }
}
