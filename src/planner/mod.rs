//! Planning module for reconciliation runs.
//!
//! This module compares local specs with the remote snapshot, producing
//! human-readable diffs and ordered plans of create, update and destroy
//! actions.

mod diff;
mod plan;

pub use diff::{AppDiff, DiffEngine, DiffHunk, DiffOperation};
pub use plan::{PlannedAction, ReconciliationOutcome, ReconciliationPlan, RemoteIndex};
