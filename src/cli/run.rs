//! Run command - plan or apply commit date fixes

use super::signal::spawn_ctrl_c_watcher;
use super::RunArgs;
use afterhours::config::{load_project_config, ProjectConfig};
use afterhours::driver::FixedPointDriver;
use afterhours::error::human_date;
use afterhours::git::{GitHistory, GitPublisher};
use afterhours::normalizer::RandomJitter;
use afterhours::reporters::{report_with_format, OutputFormat, RetimeReport, RunMode};
use afterhours::since::{parse_commit_date, parse_since};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset, Local};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Run the run command
pub fn run(args: &RunArgs) -> Result<()> {
    let workspace = &args.workspace_path;
    if !workspace.exists() {
        bail!("Workspace path not found: {}", workspace.display());
    }
    let workspace = workspace
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", workspace.display()))?;

    let single = single_commit_override(args)?;

    let history = GitHistory::open(&workspace)?;
    let repo_root = history.repo_root().to_path_buf();
    let config = effective_config(&repo_root, args)?;
    let format: OutputFormat = args
        .format
        .as_deref()
        .or(config.defaults.format.as_deref())
        .unwrap_or("text")
        .parse()?;

    eprintln!(
        "{} {}",
        style("Workspace used:").dim(),
        style(repo_root.display()).cyan()
    );

    let since_expr = args
        .since
        .clone()
        .unwrap_or_else(|| config.since().to_string());
    let since = parse_since(&since_expr, Local::now().fixed_offset())?;
    debug!("Commit range starts at {}", since.to_rfc3339());
    let history = history.since(since);

    let rewriter = config
        .rewrite
        .backend
        .build(&repo_root, config.rewrite.timeout_secs);
    let publisher = (config.publish.enabled && !args.no_push).then(|| {
        GitPublisher::new(&repo_root, config.publish.timeout_secs)
            .with_remote(config.publish.remote.clone())
            .with_branch(config.publish.branch.clone())
    });

    let stop = Arc::new(AtomicBool::new(false));
    let mut driver = FixedPointDriver::new(&history, rewriter.as_ref(), config.normalizer())
        .with_settings(config.driver_settings())
        .with_stop_flag(stop.clone());
    if let Some(publisher) = &publisher {
        driver = driver.with_publisher(publisher);
    }

    if let Some((hash, date)) = single {
        if !args.apply {
            println!(
                "Would rewrite {} to {}. {}",
                hash,
                human_date(&date),
                style("Dry run: re-run with --apply to rewrite history").yellow()
            );
            return Ok(());
        }
        driver.fix_single(&hash, date)?;
        println!(
            "{} Rewrote {} to {}",
            style("✓").green(),
            hash,
            human_date(&date)
        );
        return Ok(());
    }

    let mut jitter = match args.seed.or(config.defaults.seed) {
        Some(seed) => RandomJitter::seeded(seed),
        None => RandomJitter::from_entropy(),
    };

    let report = if args.apply {
        spawn_ctrl_c_watcher(stop)?;
        if publisher.is_some() {
            info!("Each rewrite will be force-pushed");
        }

        let spinner = if format == OutputFormat::Json {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        spinner.set_style(create_spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(100));

        let mut commits = None;
        let result = driver.run(&mut jitter, |pass| {
            commits.get_or_insert(pass.ledger.len());
            spinner.set_message(format!(
                "Pass {}: {} commit(s) to fix",
                pass.pass,
                pass.fixes.len()
            ));
        });
        spinner.finish_and_clear();
        let summary = result?;

        RetimeReport {
            mode: RunMode::Apply,
            since: since_expr,
            commits: commits.unwrap_or_default(),
            passes: summary.passes,
            fixes: summary.applied,
        }
    } else {
        let (ledger, fixes) = driver.plan(&mut jitter)?;
        RetimeReport {
            mode: RunMode::DryRun,
            since: since_expr,
            commits: ledger.len(),
            passes: 1,
            fixes,
        }
    };

    println!("{}", report_with_format(&report, format)?.trim_end());
    Ok(())
}

/// Both override flags or neither.
fn single_commit_override(args: &RunArgs) -> Result<Option<(String, DateTime<FixedOffset>)>> {
    match (&args.only_one_commit, &args.only_one_commit_date) {
        (Some(hash), Some(date)) => Ok(Some((hash.clone(), parse_commit_date(date)?))),
        (Some(_), None) => {
            bail!("If --only-one-commit is set, --only-one-commit-date should be set too.")
        }
        (None, Some(_)) => bail!("--only-one-commit-date requires --only-one-commit"),
        (None, None) => Ok(None),
    }
}

/// Config file values with CLI flags applied on top
fn effective_config(repo_root: &Path, args: &RunArgs) -> Result<ProjectConfig> {
    let mut config = load_project_config(repo_root);
    if let Some(end_hour) = args.end_hour {
        config.policy.end_hour = end_hour;
    }
    if let Some(boundary) = &args.boundary {
        config.boundary = boundary.parse().map_err(anyhow::Error::msg)?;
    }
    if let Some(max_passes) = args.max_passes {
        config.driver.max_passes = max_passes;
    }
    if let Some(backend) = &args.backend {
        config.rewrite.backend = backend.parse().map_err(anyhow::Error::msg)?;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Create spinner progress style
fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
