//! Cycle Orchestrator
//!
//! Runs one optimization cycle end to end:
//!
//! 1. fetch the latest snapshot and check its required fields (the only
//!    fatal stage)
//! 2. classify anomalies
//! 3. request a recommendation
//! 4. build the candidate snapshot
//! 5. verify the claimed saving against the energy model
//! 6. persist the cycle record
//! 7. if anomalous: notify, then create the alert
//!
//! Every stage after the first returns `Result<_, StageFailure>`; failures are
//! logged with the originating stage and folded into the [`CycleResult`].
//! Each invocation works on its own copies of the snapshot, so concurrent
//! cycles only share the external stores. A semaphore bounds how many run at
//! once.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::access::{CapabilityCheck, RoleCapabilities};
use super::dedup::{AlertDedupPolicy, NoDedup};
use super::CycleError;
use crate::anomaly::{classify, ThresholdProvider};
use crate::llm::RecommendationClient;
use crate::notify::{DispatchOutcome, NotificationDispatcher};
use crate::optimization::{build_candidate, SavingsVerifier};
use crate::storage::{AlertStore, CycleLog};
use crate::telemetry::{TelemetryError, TelemetrySource};
use crate::types::{
    AckOutcome, Actor, Alert, AnomalyCheckOutcome, AnomalyReport, Capability, CycleRecord,
    CycleResult, PlantSnapshot, RecommendationPayload, Severity, Stage, StageFailure, Trigger,
};

/// External collaborators a cycle depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub telemetry: Arc<dyn TelemetrySource>,
    pub thresholds: Arc<dyn ThresholdProvider>,
    pub recommender: Arc<dyn RecommendationClient>,
    pub verifier: SavingsVerifier,
    pub alerts: Arc<dyn AlertStore>,
    pub cycles: Arc<dyn CycleLog>,
    pub notifier: Arc<NotificationDispatcher>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Snapshot fields that must be present and finite for a cycle to run.
    pub required_fields: Vec<String>,
    pub max_concurrent_cycles: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            required_fields: [
                "raw1_frac",
                "raw2_frac",
                "grinding_efficiency",
                "kiln_temp",
                "fan_speed",
                "energy_use",
            ]
            .map(String::from)
            .to_vec(),
            max_concurrent_cycles: 4,
        }
    }
}

/// Alert and notification outcome of stage 7.
struct AlertStageOutcome {
    alert_id: Option<String>,
    notified: bool,
    suppressed: bool,
}

pub struct CycleOrchestrator {
    c: Collaborators,
    settings: OrchestratorSettings,
    dedup: Arc<dyn AlertDedupPolicy>,
    access: Arc<dyn CapabilityCheck>,
    permits: Arc<Semaphore>,
}

impl CycleOrchestrator {
    pub fn new(collaborators: Collaborators, settings: OrchestratorSettings) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent_cycles.max(1)));
        Self {
            c: collaborators,
            settings,
            dedup: Arc::new(NoDedup),
            access: Arc::new(RoleCapabilities::default()),
            permits,
        }
    }

    #[must_use]
    pub fn with_dedup(mut self, dedup: Arc<dyn AlertDedupPolicy>) -> Self {
        self.dedup = dedup;
        self
    }

    #[must_use]
    pub fn with_access(mut self, access: Arc<dyn CapabilityCheck>) -> Self {
        self.access = access;
        self
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.c
    }

    // ========================================================================
    // Exposed operations
    // ========================================================================

    /// Capability check on its own, for callers that run the work elsewhere.
    pub fn authorize(&self, actor: &Actor, capability: Capability) -> Result<(), CycleError> {
        self.access.check(actor, capability)
    }

    /// Run a cycle on behalf of an actor, after the capability check.
    pub async fn run_cycle_as(&self, actor: &Actor) -> Result<CycleResult, CycleError> {
        self.access.check(actor, Capability::RunCycle)?;
        self.run_cycle(&Trigger::from(actor)).await
    }

    /// Run one cycle. No capability check; the caller is trusted.
    pub async fn run_cycle(&self, trigger: &Trigger) -> Result<CycleResult, CycleError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CycleError::UpstreamUnavailable("orchestrator is shutting down".into()))?;

        let cycle_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        info!(cycle_id = %cycle_id, triggered_by = trigger.label(), "Cycle started");

        // Stage 1: fatal on failure
        let snapshot = self.fetch_snapshot().await?;
        self.check_required_fields(&snapshot)?;

        // Stage 2
        let policy = self.c.thresholds.policy_for(snapshot.plant_id.as_deref());
        let report = classify(&snapshot, &policy);
        debug!(
            cycle_id = %cycle_id,
            severity = %report.severity(),
            anomalies = report.anomalies().len(),
            "Snapshot classified"
        );

        let mut failures = Vec::new();

        // Stages 3-5
        let recommendation = self.recommend_and_verify(&snapshot, &mut failures).await;

        // Stage 6
        let record = CycleRecord {
            cycle_id: cycle_id.clone(),
            timestamp: now,
            triggered_by: trigger.label().to_string(),
            state: snapshot.clone(),
            anomaly: report.clone(),
            recommendation: recommendation.clone(),
        };
        let persistence_error = match self.c.cycles.record(&record) {
            Ok(()) => None,
            Err(e) => {
                let failure = stage_failure(Stage::Persist, e);
                let msg = failure.message.clone();
                failures.push(failure);
                Some(msg)
            }
        };

        // Stage 7
        let alert_stage = if report.anomaly_flag() {
            self.alert_and_notify(&report, &snapshot, now, &mut failures).await
        } else {
            AlertStageOutcome {
                alert_id: None,
                notified: false,
                suppressed: false,
            }
        };

        let result = CycleResult {
            cycle_id,
            timestamp: now,
            triggered_by: trigger.label().to_string(),
            state: snapshot,
            anomaly: report,
            recommendation,
            persisted: persistence_error.is_none(),
            persistence_error,
            alert_id: alert_stage.alert_id,
            notified: alert_stage.notified,
            degraded: !failures.is_empty(),
            stage_failures: failures,
        };

        info!(
            cycle_id = %result.cycle_id,
            severity = %result.anomaly.severity(),
            candidates = result.recommendation.recommendation.recommendations.len(),
            verified_saving_pct = ?result.recommendation.verified_saving_pct,
            persisted = result.persisted,
            degraded = result.degraded,
            "Cycle finished"
        );
        Ok(result)
    }

    /// Scheduled anomaly check: fetch, classify and, when anomalous, alert and notify.
    ///
    /// Classification tolerates missing fields, so the required-field check of
    /// a full cycle does not apply here.
    pub async fn detect_anomalies(&self) -> Result<AnomalyCheckOutcome, CycleError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CycleError::UpstreamUnavailable("orchestrator is shutting down".into()))?;

        let now = Utc::now();
        let snapshot = self.fetch_snapshot().await?;
        let policy = self.c.thresholds.policy_for(snapshot.plant_id.as_deref());
        let report = classify(&snapshot, &policy);

        let mut failures = Vec::new();
        let outcome = if report.anomaly_flag() {
            self.alert_and_notify(&report, &snapshot, now, &mut failures).await
        } else {
            AlertStageOutcome {
                alert_id: None,
                notified: false,
                suppressed: false,
            }
        };

        info!(
            severity = %report.severity(),
            anomalies = report.anomalies().len(),
            alert_id = ?outcome.alert_id,
            suppressed = outcome.suppressed,
            "Anomaly check finished"
        );

        Ok(AnomalyCheckOutcome {
            timestamp: now,
            anomaly_detected: report.anomaly_flag(),
            anomaly: report,
            alert_id: outcome.alert_id,
            notified: outcome.notified,
            suppressed: outcome.suppressed,
            stage_failures: failures,
        })
    }

    /// Recommend and verify for a caller-supplied snapshot. Nothing is
    /// persisted and no alert is raised.
    pub async fn recommend_for(&self, snapshot: &PlantSnapshot) -> RecommendationPayload {
        let mut failures = Vec::new();
        let payload = self.recommend_and_verify(snapshot, &mut failures).await;
        debug!(
            candidates = payload.recommendation.recommendations.len(),
            verified_saving_pct = ?payload.verified_saving_pct,
            failures = failures.len(),
            "Ad-hoc recommendation finished"
        );
        payload
    }

    /// Classify an arbitrary snapshot with the policy for its plant.
    pub fn classify(&self, snapshot: &PlantSnapshot) -> AnomalyReport {
        let policy = self.c.thresholds.policy_for(snapshot.plant_id.as_deref());
        classify(snapshot, &policy)
    }

    pub fn list_alerts(
        &self,
        limit: usize,
        severity: Option<Severity>,
    ) -> Result<Vec<Alert>, CycleError> {
        self.c
            .alerts
            .list(limit, severity)
            .map_err(|e| CycleError::UpstreamUnavailable(e.to_string()))
    }

    pub fn recent_cycles(&self, limit: usize) -> Result<Vec<CycleRecord>, CycleError> {
        self.c
            .cycles
            .recent(limit)
            .map_err(|e| CycleError::UpstreamUnavailable(e.to_string()))
    }

    /// Acknowledge an alert. Unknown ids map to [`CycleError::NotFound`].
    pub fn acknowledge_alert(&self, id: &str, actor: &Actor) -> Result<AckOutcome, CycleError> {
        self.access.check(actor, Capability::AcknowledgeAlert)?;
        let outcome = self
            .c
            .alerts
            .acknowledge(id, &actor.email, Utc::now())
            .map_err(|e| CycleError::UpstreamUnavailable(e.to_string()))?;

        match &outcome {
            AckOutcome::Acknowledged(_) => {
                info!(alert_id = id, actor = %actor.email, "Alert acknowledged")
            }
            AckOutcome::AlreadyAcknowledged(_) => {
                debug!(alert_id = id, actor = %actor.email, "Alert already acknowledged")
            }
            AckOutcome::NotFound => return Err(CycleError::NotFound(format!("alert {id}"))),
        }
        Ok(outcome)
    }

    // ========================================================================
    // Stages
    // ========================================================================

    async fn fetch_snapshot(&self) -> Result<PlantSnapshot, CycleError> {
        let source = self.c.telemetry.source_name();
        let snapshot = match self.c.telemetry.fetch_latest().await {
            Ok(Some(s)) => s,
            Ok(None) => {
                warn!(stage = %Stage::FetchState, source, "No plant state available");
                return Err(CycleError::NotFound("no plant state available".into()));
            }
            Err(TelemetryError::Malformed(msg)) => {
                warn!(stage = %Stage::FetchState, source, error = %msg, "Malformed plant state");
                return Err(CycleError::Validation(msg));
            }
            Err(e) => {
                warn!(stage = %Stage::FetchState, source, error = %e, "Telemetry fetch failed");
                return Err(CycleError::UpstreamUnavailable(e.to_string()));
            }
        };
        Ok(snapshot)
    }

    fn check_required_fields(&self, snapshot: &PlantSnapshot) -> Result<(), CycleError> {
        let missing = snapshot.missing_fields(&self.settings.required_fields);
        if missing.is_empty() {
            return Ok(());
        }
        warn!(stage = %Stage::FetchState, missing = ?missing, "Plant state missing required fields");
        Err(CycleError::Validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }

    async fn recommend_and_verify(
        &self,
        snapshot: &PlantSnapshot,
        failures: &mut Vec<StageFailure>,
    ) -> RecommendationPayload {
        let mut payload = RecommendationPayload::default();

        match self.c.recommender.recommend(snapshot).await {
            Ok(rec) => payload.recommendation = rec,
            Err(e) => {
                let failure = stage_failure(Stage::Recommend, e);
                payload.error = Some(failure.message.clone());
                failures.push(failure);
            }
        }

        let candidate = build_candidate(snapshot, &payload.recommendation.recommendations);

        payload.verified_saving_pct = self.c.verifier.verify(snapshot, &candidate).await;
        if payload.verified_saving_pct.is_none() {
            failures.push(stage_failure(
                Stage::VerifySavings,
                "energy saving could not be verified",
            ));
        }
        payload
    }

    async fn alert_and_notify(
        &self,
        report: &AnomalyReport,
        snapshot: &PlantSnapshot,
        now: DateTime<Utc>,
        failures: &mut Vec<StageFailure>,
    ) -> AlertStageOutcome {
        if !self.dedup.admit(report, now) {
            info!(severity = %report.severity(), "Alert suppressed by deduplication policy");
            return AlertStageOutcome {
                alert_id: None,
                notified: false,
                suppressed: true,
            };
        }

        let outcome = self.c.notifier.dispatch(report, snapshot).await;
        if let DispatchOutcome::Failed { error, .. } = &outcome {
            failures.push(stage_failure(Stage::Notify, error));
        }
        let notified = outcome.attempted();

        let alert = Alert::new(report, snapshot, notified, now);
        let alert_id = match self.c.alerts.create(&alert) {
            Ok(id) => {
                info!(alert_id = %id, severity = %alert.severity, "Alert created");
                Some(id)
            }
            Err(e) => {
                failures.push(stage_failure(Stage::CreateAlert, e));
                // Nothing was stored, so the next observation may alert again.
                self.dedup.release(report);
                None
            }
        };

        AlertStageOutcome {
            alert_id,
            notified,
            suppressed: false,
        }
    }
}

fn stage_failure(stage: Stage, err: impl std::fmt::Display) -> StageFailure {
    let message = err.to_string();
    warn!(stage = %stage, error = %message, "Stage failed, continuing");
    StageFailure::new(stage, message)
}
