//! Cycle Pipeline
//!
//! The orchestrator that composes classification, recommendation,
//! verification, persistence and notification into one cycle, plus the
//! capability check, alert deduplication hook and periodic scheduler around it.

mod access;
mod dedup;
mod orchestrator;
pub mod scheduler;

pub use access::{CapabilityCheck, RoleCapabilities};
pub use dedup::{AlertDedupPolicy, NoDedup, WindowedDedup};
pub use orchestrator::{Collaborators, CycleOrchestrator, OrchestratorSettings};
pub use scheduler::{run_scheduler, run_tick, ScheduleMode};

use crate::types::Capability;

/// Errors that abort a cycle (or a core operation) before it produces a result.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("actor '{actor}' may not {capability}")]
    Forbidden {
        actor: String,
        capability: Capability,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("validation failed: {0}")]
    Validation(String),
}
