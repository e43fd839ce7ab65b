//! Persisted alert records and acknowledgment outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnomalyReport, AnomalyTag, PlantSnapshot, Severity};

/// An anomaly report persisted for human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub anomalies: Vec<AnomalyTag>,
    pub critical_anomalies: Vec<AnomalyTag>,
    pub warning_anomalies: Vec<AnomalyTag>,
    pub plant_state: PlantSnapshot,
    /// Set once notification delivery has been attempted, whatever the outcome.
    /// A skipped dispatch (no transport configured, no recipients) leaves it
    /// `false`.
    pub notified: bool,
    pub acknowledged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Build an unacknowledged alert with a fresh id.
    pub fn new(
        report: &AnomalyReport,
        snapshot: &PlantSnapshot,
        notified: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            severity: report.severity(),
            anomalies: report.anomalies().to_vec(),
            critical_anomalies: report.critical_anomalies().to_vec(),
            warning_anomalies: report.warning_anomalies().to_vec(),
            plant_state: snapshot.clone(),
            notified,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    /// One-way transition to acknowledged.
    ///
    /// Returns `false` and leaves the record untouched if it was already
    /// acknowledged.
    pub fn acknowledge(&mut self, actor: &str, at: DateTime<Utc>) -> bool {
        if self.acknowledged {
            return false;
        }
        self.acknowledged = true;
        self.acknowledged_by = Some(actor.to_string());
        self.acknowledged_at = Some(at);
        true
    }
}

/// Result of an acknowledgment request.
#[derive(Debug, Clone, PartialEq)]
pub enum AckOutcome {
    /// The alert transitioned to acknowledged by this call.
    Acknowledged(Alert),
    /// The alert was already acknowledged; the stored record is returned unchanged.
    AlreadyAcknowledged(Alert),
    NotFound,
}

impl AckOutcome {
    /// `true` for both acknowledgment variants.
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}
