//! Cycle stages, per-stage failures, and the cycle result

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnomalyReport, PlantSnapshot, Recommendation};

/// Stages of one optimization cycle, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FetchState,
    Classify,
    Recommend,
    BuildCandidate,
    VerifySavings,
    Persist,
    CreateAlert,
    Notify,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FetchState => "fetch_state",
            Self::Classify => "classify",
            Self::Recommend => "recommend",
            Self::BuildCandidate => "build_candidate",
            Self::VerifySavings => "verify_savings",
            Self::Persist => "persist",
            Self::CreateAlert => "create_alert",
            Self::Notify => "notify",
        };
        f.write_str(s)
    }
}

/// A non-fatal stage failure folded into the cycle result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// The recommendation as it appears in a cycle result: the recommender's
/// payload plus the independent verification and any stage error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPayload {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    /// `None` when verification was impossible.
    pub verified_saving_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Document written to the durable cycle log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle_id: String,
    pub timestamp: DateTime<Utc>,
    pub triggered_by: String,
    pub state: PlantSnapshot,
    pub anomaly: AnomalyReport,
    pub recommendation: RecommendationPayload,
}

/// Externally observable outcome of one completed cycle.
///
/// A cycle that could not obtain plant state never produces one of these;
/// see `CycleError`. A result with `degraded == true` completed with one or
/// more stage failures listed in `stage_failures`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub cycle_id: String,
    pub timestamp: DateTime<Utc>,
    pub triggered_by: String,
    pub state: PlantSnapshot,
    pub anomaly: AnomalyReport,
    pub recommendation: RecommendationPayload,
    /// Whether the cycle record reached durable storage.
    pub persisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    pub notified: bool,
    pub degraded: bool,
    pub stage_failures: Vec<StageFailure>,
}

impl CycleResult {
    pub fn failure(&self, stage: Stage) -> Option<&StageFailure> {
        self.stage_failures.iter().find(|f| f.stage == stage)
    }
}

/// Outcome of the scheduled anomaly check (no recommendation stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyCheckOutcome {
    pub timestamp: DateTime<Utc>,
    pub anomaly_detected: bool,
    pub anomaly: AnomalyReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    pub notified: bool,
    /// The alert was withheld by the deduplication policy.
    pub suppressed: bool,
    pub stage_failures: Vec<StageFailure>,
}
