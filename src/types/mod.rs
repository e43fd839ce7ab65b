//! Shared data structures for the cement plant optimization pipeline
//!
//! This module defines the core types that flow through one cycle:
//! - PlantSnapshot (one timestamped telemetry reading)
//! - ThresholdPolicy (per-parameter critical/warning bounds)
//! - AnomalyReport (severity-graded classifier output)
//! - Recommendation / CandidateChange (proposed parameter deltas)
//! - Alert (persisted anomaly record with acknowledgment state)
//! - CycleResult (externally observable outcome of one orchestrated cycle)

mod snapshot;
pub mod thresholds;
mod anomaly;
mod recommendation;
mod alert;
mod cycle;
mod access;

pub use snapshot::*;
pub use thresholds::*;
pub use anomaly::*;
pub use recommendation::*;
pub use alert::*;
pub use cycle::*;
pub use access::*;
