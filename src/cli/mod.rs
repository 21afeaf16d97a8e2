//! CLI command definitions and handlers

mod init;
mod run;
mod signal;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// afterhours - move commit dates out of working hours
///
/// Rewrites the dates of commits made during working hours so they follow
/// the closest earlier commit made outside them, keeping order and spacing.
#[derive(Parser, Debug)]
#[command(name = "afterhours")]
#[command(
    version,
    about = "Move git commit dates out of working hours while keeping their order",
    long_about = "afterhours finds commits whose author date falls on a weekday between \
9:00 and 18:59 (configurable) and moves each one to a few seconds after the closest \
earlier commit made outside those hours.\n\n\
Nothing is rewritten without --apply. Rewriting changes commit hashes and, unless \
--no-push is given, force-pushes the branch after every rewrite.\n\n\
Run without a subcommand to preview the current directory:\n  \
afterhours",
    after_help = "\
Examples:
  afterhours run                                 Preview fixes for the last 2 weeks
  afterhours run . 3.days                        Preview fixes for the last 3 days
  afterhours run . 2.weeks --apply --no-push     Rewrite locally, do not push
  afterhours run . --format json                 JSON plan for scripting
  afterhours run . --only-one-commit abc1234 --only-one-commit-date '2024-06-01 23:45:00' --apply
  afterhours init                                Write an afterhours.toml template"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize an afterhours.toml config file with example settings
    Init {
        /// Repository path
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Find commits inside the disallowed window and move them out
    #[command(after_help = "\
Examples:
  afterhours run                                 Dry run over the last 2 weeks
  afterhours run ../service 1.month              Another checkout, last month
  afterhours run . --apply                       Rewrite and force-push
  afterhours run . --apply --no-push --seed 7    Reproducible local rewrite
  afterhours run . --end-hour 19 --boundary abort")]
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// The workspace path of the local git checkout
    #[arg(default_value = ".")]
    pub workspace_path: PathBuf,

    /// Lower bound of the commit range (e.g. 2.weeks, "3 days ago", 2024-06-01)
    /// [default: 2.weeks or defaults.since from the config]
    pub since: Option<String>,

    /// Rewrite history (without it, only print the plan)
    #[arg(long)]
    pub apply: bool,

    /// Do not force-push after rewriting
    #[arg(long)]
    pub no_push: bool,

    /// Rewrite only this commit, to --only-one-commit-date
    #[arg(long, value_name = "HASH")]
    pub only_one_commit: Option<String>,

    /// Date for --only-one-commit (YYYY-MM-DD HH:MM:SS, local time, or RFC 3339)
    #[arg(long, value_name = "DATE")]
    pub only_one_commit_date: Option<String>,

    /// Output format: text, json
    #[arg(long, short = 'f', value_parser = ["text", "json"])]
    pub format: Option<String>,

    /// Seed for the jitter generator (reproducible dates)
    #[arg(long, env = "AFTERHOURS_SEED")]
    pub seed: Option<u64>,

    /// Maximum number of normalization passes
    #[arg(long)]
    pub max_passes: Option<usize>,

    /// What to do when the first commit in range is disallowed: skip, abort
    #[arg(long, env = "AFTERHOURS_BOUNDARY", value_parser = ["skip", "abort"])]
    pub boundary: Option<String>,

    /// Last disallowed hour, inclusive (default 18)
    #[arg(long, env = "AFTERHOURS_END_HOUR", value_parser = clap::value_parser!(u32).range(0..=23))]
    pub end_hour: Option<u32>,

    /// Rewrite backend: native, filter-branch
    #[arg(long, value_parser = ["native", "filter-branch"])]
    pub backend: Option<String>,
}

/// Run the CLI command
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Init { path }) => init::run(&path),

        Some(Commands::Run(args)) => run::run(&args),

        // Default: dry run over the current directory
        None => run::run(&RunArgs {
            workspace_path: PathBuf::from("."),
            ..Default::default()
        }),
    }
}
