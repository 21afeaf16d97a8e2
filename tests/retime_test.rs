//! End-to-end retiming against real temporary repositories
//!
//! Drives the fixed-point loop with the libgit2 ledger source and rewriter,
//! then reads history back to check the result.

mod common;

use afterhours::driver::{FixedPointDriver, LedgerSource};
use afterhours::git::{GitHistory, NativeRewriter};
use afterhours::normalizer::{FixedJitter, Normalizer, RandomJitter};
use afterhours::policy::TimeWindow;
use afterhours::RetimeError;
use chrono::{DateTime, Duration};
use common::{scenario_repo, HOUR, MONDAY};

fn utc(secs: i64) -> DateTime<chrono::FixedOffset> {
    DateTime::from_timestamp(secs, 0).unwrap().fixed_offset()
}

#[test]
fn test_run_moves_every_commit_out_of_working_hours() {
    let dir = tempfile::tempdir().unwrap();
    let (repo, ids) = scenario_repo(dir.path());

    let history = GitHistory::open(dir.path()).unwrap();
    let rewriter = NativeRewriter::new(dir.path());
    let driver = FixedPointDriver::new(&history, &rewriter, Normalizer::default());

    let mut planned = Vec::new();
    let summary = driver
        .run(&mut FixedJitter::new(vec![15, 40, 25]), |pass| {
            planned.push(pass.fixes.len())
        })
        .unwrap();

    assert_eq!(planned, vec![3, 2, 1, 0]);
    assert_eq!(summary.passes, 4);
    assert_eq!(summary.applied.len(), 3);

    let ledger = history.load().unwrap();
    let commits = ledger.records();
    let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
    assert_eq!(messages, vec!["early", "standup", "review", "evening", "lunch"]);

    // The allowed root is untouched; everything after the first fix is new
    assert_eq!(commits[0].hash, ids[0].to_string());
    for (commit, old) in commits.iter().zip(&ids).skip(1) {
        assert_ne!(commit.hash, old.to_string());
    }

    let window = TimeWindow::default();
    assert!(commits.iter().all(|c| !window.is_disallowed(&c.author_date)));
    assert!(commits
        .windows(2)
        .all(|w| w[0].author_date < w[1].author_date));

    // Chained off "early", then off the new "standup"; "lunch" off "evening".
    // Every pass re-plans, so the jitter sequence keeps cycling: 15 (pass 1),
    // 15 (pass 2), 25 (pass 3).
    assert_eq!(commits[1].author_date, utc(MONDAY + 7 * HOUR + 15));
    assert_eq!(commits[2].author_date, commits[1].author_date + Duration::seconds(15));
    assert_eq!(commits[3].author_date, utc(MONDAY + 20 * HOUR));
    assert_eq!(commits[4].author_date, utc(MONDAY + 20 * HOUR + 25));
    for c in &commits[1..] {
        assert_eq!(c.author_date, c.committer_date);
    }

    // Content is unchanged
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    let old_tip = repo.find_commit(ids[4]).unwrap();
    assert_eq!(head.tree_id(), old_tip.tree_id());
}

#[test]
fn test_second_run_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    scenario_repo(dir.path());

    let history = GitHistory::open(dir.path()).unwrap();
    let rewriter = NativeRewriter::new(dir.path());
    let driver = FixedPointDriver::new(&history, &rewriter, Normalizer::default());
    driver.run(&mut RandomJitter::seeded(3), |_| {}).unwrap();
    let after_first = history.load().unwrap();

    let summary = driver.run(&mut RandomJitter::seeded(4), |_| {}).unwrap();
    assert_eq!(summary.passes, 1);
    assert!(summary.applied.is_empty());
    assert_eq!(history.load().unwrap().records(), after_first.records());
}

#[test]
fn test_plan_does_not_touch_history() {
    let dir = tempfile::tempdir().unwrap();
    let (_repo, ids) = scenario_repo(dir.path());

    let history = GitHistory::open(dir.path()).unwrap();
    let rewriter = NativeRewriter::new(dir.path());
    let driver = FixedPointDriver::new(&history, &rewriter, Normalizer::default());
    let (ledger, fixes) = driver.plan(&mut RandomJitter::seeded(9)).unwrap();

    assert_eq!(ledger.len(), 5);
    let flagged: Vec<&str> = fixes.iter().map(|f| f.commit.message.as_str()).collect();
    assert_eq!(flagged, vec!["standup", "review", "lunch"]);
    for fix in &fixes {
        assert!(fix.jitter() >= Duration::seconds(10));
        assert!(fix.jitter() <= Duration::seconds(50));
    }
    assert_eq!(
        history.load().unwrap().records()[4].hash,
        ids[4].to_string()
    );
}

#[test]
fn test_range_starting_inside_working_hours_has_no_anchor() {
    let dir = tempfile::tempdir().unwrap();
    scenario_repo(dir.path());

    // "standup" becomes the first commit in range and is skipped, leaving
    // "review" with nothing earlier to anchor to
    let history = GitHistory::open(dir.path())
        .unwrap()
        .since(utc(MONDAY + 9 * HOUR));
    let rewriter = NativeRewriter::new(dir.path());
    let driver = FixedPointDriver::new(&history, &rewriter, Normalizer::default());

    let err = driver.run(&mut RandomJitter::seeded(1), |_| {}).unwrap_err();
    match err {
        RetimeError::AnchorNotFound { index, .. } => assert_eq!(index, 1),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_fix_single_rewrites_exactly_that_commit() {
    let dir = tempfile::tempdir().unwrap();
    let (_repo, ids) = scenario_repo(dir.path());

    let history = GitHistory::open(dir.path()).unwrap();
    let rewriter = NativeRewriter::new(dir.path());
    let driver = FixedPointDriver::new(&history, &rewriter, Normalizer::default());
    let when = DateTime::parse_from_rfc3339("2024-06-02T23:45:00+02:00").unwrap();
    driver.fix_single(&ids[3].to_string(), when).unwrap();

    let ledger = history.load().unwrap();
    let commits = ledger.records();
    assert_eq!(commits[2].hash, ids[2].to_string());
    assert_eq!(commits[3].message, "evening");
    assert_eq!(commits[3].author_date, when);
    assert_eq!(commits[3].committer_date, when);
    assert_eq!(commits[3].author_date.offset().local_minus_utc(), 7200);
    assert_eq!(commits[4].author_date, utc(MONDAY + 35 * HOUR));
}
