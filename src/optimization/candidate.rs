//! Candidate snapshot construction

use crate::types::{CandidateChange, PlantSnapshot};

/// Apply each change, left to right, over a copy of `original`.
///
/// A later change to the same parameter overwrites an earlier one. The
/// original is never touched.
pub fn build_candidate(original: &PlantSnapshot, changes: &[CandidateChange]) -> PlantSnapshot {
    let mut candidate = original.clone();
    for change in changes {
        candidate.set(&change.parameter, change.new_value);
    }
    candidate
}
