//! Running external commands with captured output and a timeout
//!
//! Used for the git operations libgit2 does not cover (`filter-branch`,
//! `push`). Output is drained on background threads so a chatty process
//! cannot block on a full pipe while we wait for it.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished (or killed) process
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` if killed by a signal or on timeout
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{program} not found. Please install it first.")]
    NotFound { program: String },

    #[error("Failed to run {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} timed out after {secs}s")]
    TimedOut { command: String, secs: u64 },

    #[error("{command} failed (exit code {code:?}): {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::TimedOut { .. })
    }
}

/// Runs programs in a fixed working directory.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    cwd: PathBuf,
    timeout: Option<Duration>,
    env: Vec<(String, String)>,
}

impl CommandRunner {
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            timeout: None,
            env: Vec::new(),
        }
    }

    /// Kill commands that run longer than `secs` (0 disables the timeout)
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Run a command and capture its output regardless of exit status.
    pub fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let cmdline = display_command(program, args);
        debug!("Running in {}: {}", self.cwd.display(), cmdline);

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::NotFound {
                    program: program.to_string(),
                }
            } else {
                CommandError::Io {
                    command: cmdline.clone(),
                    source: e,
                }
            }
        })?;

        let output = self.wait(child).map_err(|e| CommandError::Io {
            command: cmdline.clone(),
            source: e,
        })?;

        if !output.stdout.is_empty() {
            debug!("{} stdout: {}", program, output.stdout.trim_end());
        }
        if !output.stderr.is_empty() {
            debug!("{} stderr: {}", program, output.stderr.trim_end());
        }

        if output.timed_out {
            let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
            warn!("{} timed out after {}s", cmdline, secs);
            return Err(CommandError::TimedOut {
                command: cmdline,
                secs,
            });
        }
        Ok(output)
    }

    /// Run a command and return its stdout, failing on a nonzero exit status
    /// unless `ignore_errors` is set.
    pub fn run_checked(
        &self,
        program: &str,
        args: &[&str],
        ignore_errors: bool,
    ) -> Result<String, CommandError> {
        let output = self.run(program, args)?;
        if !output.success() {
            if ignore_errors {
                debug!(
                    "Ignoring failure of {} (exit code {:?})",
                    display_command(program, args),
                    output.exit_code
                );
            } else {
                return Err(CommandError::Failed {
                    command: display_command(program, args),
                    code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr.trim().to_string(),
                });
            }
        }
        Ok(output.stdout)
    }

    fn wait(&self, mut child: Child) -> std::io::Result<CommandOutput> {
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let start = Instant::now();
        let mut timed_out = false;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if self.timeout.is_some_and(|t| start.elapsed() > t) {
                let _ = child.kill();
                let _ = child.wait();
                timed_out = true;
                break None;
            }
            thread::sleep(POLL_INTERVAL);
        };

        // Grandchildren of a killed process may still hold the pipes open, so
        // the readers are detached rather than joined after a timeout.
        let collect = |handle: Option<thread::JoinHandle<String>>| {
            if timed_out {
                return String::new();
            }
            handle.and_then(|h| h.join().ok()).unwrap_or_default()
        };
        Ok(CommandOutput {
            stdout: collect(stdout),
            stderr: collect(stderr),
            exit_code: status.and_then(|s| s.code()),
            timed_out,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
