//! Cement Ops: plant anomaly classification and optimization cycles
//!
//! ## Architecture
//!
//! - **Anomaly**: two-tier threshold classifier over one plant snapshot
//! - **LLM**: external generative-model client producing parameter recommendations
//! - **Optimization**: candidate construction, energy-model verification, fuel-mix sweep
//! - **Pipeline**: the cycle orchestrator, access checks, dedup hook and scheduler
//! - **Notify / Storage**: alert e-mails and durable alert / cycle records
//! - **API**: axum HTTP surface over the orchestrator

pub mod anomaly;
pub mod api;
pub mod config;
pub mod llm;
pub mod notify;
pub mod optimization;
pub mod pipeline;
pub mod storage;
pub mod telemetry;
pub mod types;

// Re-export configuration
pub use config::PlantConfig;

// Re-export commonly used types
pub use types::{
    Actor, Alert, AnomalyReport, AnomalyTag, CycleResult, PlantSnapshot, Recommendation, Role,
    Severity, ThresholdPolicy,
};

// Re-export the orchestrator surface
pub use pipeline::{Collaborators, CycleError, CycleOrchestrator, OrchestratorSettings};
