//! afterhours - move git commit dates out of working hours
//!
//! The core is the [`normalizer`]: given the commits in range, oldest first,
//! it proposes a new date for every commit whose author date falls inside a
//! disallowed [`policy::TimeWindow`]. The [`driver`] applies those proposals
//! one rewrite at a time, reloading history after each, until nothing is left
//! to fix. The repository is reached through the traits in [`driver`], with
//! git-backed implementations in [`git`].

pub mod config;
pub mod driver;
pub mod error;
pub mod git;
pub mod ledger;
pub mod models;
pub mod normalizer;
pub mod policy;
pub mod reporters;
pub mod since;

pub use error::{RetimeError, RetimeResult};
