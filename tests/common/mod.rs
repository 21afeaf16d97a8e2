//! Shared fixtures for integration tests

#![allow(dead_code)]

use git2::{Oid, Repository, Signature, Time};
use std::path::Path;

/// 2024-06-03T00:00:00Z, a Monday
pub const MONDAY: i64 = 1_717_372_800;
pub const HOUR: i64 = 3600;

/// Commit a change to `notes.txt` on top of HEAD, authored and committed at
/// `secs` (UTC).
pub fn commit_at(repo: &Repository, message: &str, secs: i64) -> Oid {
    let sig = Signature::new("Dev", "dev@example.com", &Time::new(secs, 0)).unwrap();
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join("notes.txt"), message).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new("notes.txt")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Five commits, three of them inside Monday-Tuesday working hours:
///
/// | # | message   | date (UTC)     | disallowed |
/// |---|-----------|----------------|------------|
/// | 0 | early     | Mon 07:00      | no         |
/// | 1 | standup   | Mon 10:00      | yes        |
/// | 2 | review    | Mon 10:20      | yes        |
/// | 3 | evening   | Mon 20:00      | no         |
/// | 4 | lunch     | Tue 11:00      | yes        |
pub fn scenario_repo(dir: &Path) -> (Repository, Vec<Oid>) {
    let repo = Repository::init(dir).unwrap();
    let ids = vec![
        commit_at(&repo, "early", MONDAY + 7 * HOUR),
        commit_at(&repo, "standup", MONDAY + 10 * HOUR),
        commit_at(&repo, "review", MONDAY + 10 * HOUR + 20 * 60),
        commit_at(&repo, "evening", MONDAY + 20 * HOUR),
        commit_at(&repo, "lunch", MONDAY + 35 * HOUR),
    ];
    (repo, ids)
}
