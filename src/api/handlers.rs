//! API handlers
//!
//! All handlers return `Response` via [`ApiResponse::ok`] or an error mapped
//! through [`ApiErrorResponse`].

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::actor::RequestActor;
use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::config::PlantConfig;
use crate::notify::NotifyError;
use crate::optimization::{fuel_mix::DEFAULT_ALT_FUEL_STEPS, simulate_fuel_mix, EnergyPredictor};
use crate::pipeline::CycleOrchestrator;
use crate::telemetry::HistoryFilter;
use crate::types::{
    AckOutcome, Alert, AnomalyCheckOutcome, AnomalyTag, Capability, PlantSnapshot,
    RecommendationPayload, Severity,
};

/// Shared state for every handler.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<CycleOrchestrator>,
    pub config: Arc<PlantConfig>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<CycleOrchestrator>, config: Arc<PlantConfig>) -> Self {
        Self { orchestrator, config }
    }

    fn predictor(&self) -> &Arc<dyn EnergyPredictor> {
        self.orchestrator.collaborators().verifier.predictor()
    }
}

const DEFAULT_ALERT_LIMIT: usize = 50;
const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_CYCLE_LIMIT: usize = 20;
const MAX_LIMIT: usize = 1000;

fn clamp_limit(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<usize>,
    pub severity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub plant_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdsQuery {
    pub plant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub alert_id: String,
}

#[derive(Debug, Serialize)]
pub struct AcknowledgeResponse {
    pub acknowledged: bool,
    pub already_acknowledged: bool,
    pub alert: Alert,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestEmailRequest {
    /// Defaults to the caller's address.
    pub email: Option<String>,
}

/// Flat view of an anomaly check for polling clients.
#[derive(Debug, Serialize)]
pub struct AnomalyCheckResponse {
    pub timestamp: DateTime<Utc>,
    pub anomaly_detected: bool,
    pub severity: Severity,
    pub anomalies: Vec<AnomalyTag>,
    pub critical_anomalies: Vec<AnomalyTag>,
    pub warning_anomalies: Vec<AnomalyTag>,
    pub alert_id: Option<String>,
    pub notified: bool,
    pub suppressed: bool,
    pub degraded: bool,
}

impl From<AnomalyCheckOutcome> for AnomalyCheckResponse {
    fn from(o: AnomalyCheckOutcome) -> Self {
        Self {
            timestamp: o.timestamp,
            anomaly_detected: o.anomaly_detected,
            severity: o.anomaly.severity(),
            anomalies: o.anomaly.anomalies().to_vec(),
            critical_anomalies: o.anomaly.critical_anomalies().to_vec(),
            warning_anomalies: o.anomaly.warning_anomalies().to_vec(),
            alert_id: o.alert_id,
            notified: o.notified,
            suppressed: o.suppressed,
            degraded: !o.stage_failures.is_empty(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub requested_by: String,
    pub recommendation: RecommendationPayload,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub plant: String,
    pub recommender: String,
    pub predictor: String,
    pub notifications_configured: bool,
    pub telemetry: String,
}

// ============================================================================
// Cycle
// ============================================================================

/// POST /api/v1/cycle/run
pub async fn run_cycle(State(state): State<ApiState>, RequestActor(actor): RequestActor) -> Response {
    match state.orchestrator.run_cycle_as(&actor).await {
        Ok(result) => ApiResponse::ok(result),
        Err(e) => e.into_response(),
    }
}

/// GET /api/v1/cycles/recent?limit=20
pub async fn recent_cycles(State(state): State<ApiState>, Query(q): Query<LimitQuery>) -> Response {
    match state.orchestrator.recent_cycles(clamp_limit(q.limit, DEFAULT_CYCLE_LIMIT)) {
        Ok(records) => ApiResponse::ok(records),
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Alerts
// ============================================================================

/// GET /api/v1/alerts/recent?limit=50&severity=critical
pub async fn recent_alerts(State(state): State<ApiState>, Query(q): Query<AlertsQuery>) -> Response {
    let severity = match q.severity.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => match raw.parse::<Severity>() {
            Ok(s) => Some(s),
            Err(e) => return ApiErrorResponse::bad_request(e),
        },
        None => None,
    };
    match state
        .orchestrator
        .list_alerts(clamp_limit(q.limit, DEFAULT_ALERT_LIMIT), severity)
    {
        Ok(alerts) => ApiResponse::ok(alerts),
        Err(e) => e.into_response(),
    }
}

/// POST /api/v1/alerts/acknowledge
pub async fn acknowledge_alert(
    State(state): State<ApiState>,
    RequestActor(actor): RequestActor,
    Json(req): Json<AcknowledgeRequest>,
) -> Response {
    if req.alert_id.trim().is_empty() {
        return ApiErrorResponse::bad_request("alert_id is required");
    }
    match state.orchestrator.acknowledge_alert(req.alert_id.trim(), &actor) {
        Ok(AckOutcome::Acknowledged(alert)) => ApiResponse::ok(AcknowledgeResponse {
            acknowledged: true,
            already_acknowledged: false,
            alert,
        }),
        Ok(AckOutcome::AlreadyAcknowledged(alert)) => ApiResponse::ok(AcknowledgeResponse {
            acknowledged: true,
            already_acknowledged: true,
            alert,
        }),
        Ok(AckOutcome::NotFound) => ApiErrorResponse::not_found(format!("alert {}", req.alert_id)),
        Err(e) => e.into_response(),
    }
}

/// POST /api/v1/alerts/check-now
///
/// Starts an anomaly check in the background and returns immediately.
pub async fn check_now(State(state): State<ApiState>, RequestActor(actor): RequestActor) -> Response {
    if let Err(e) = state.orchestrator.authorize(&actor, Capability::RunCycle) {
        return e.into_response();
    }
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        if let Err(e) = orchestrator.detect_anomalies().await {
            tracing::warn!(error = %e, "Background anomaly check failed");
        }
    });
    tracing::info!(actor = %actor.email, "Anomaly check started");
    ApiResponse::accepted(serde_json::json!({ "status": "started" }))
}

/// POST /api/v1/alerts/scheduled-check
///
/// Entry point for an external scheduler; runs the check synchronously.
pub async fn scheduled_check(State(state): State<ApiState>) -> Response {
    match state.orchestrator.detect_anomalies().await {
        Ok(outcome) => ApiResponse::ok(AnomalyCheckResponse::from(outcome)),
        Err(e) => e.into_response(),
    }
}

/// POST /api/v1/alerts/test-email
pub async fn test_email(
    State(state): State<ApiState>,
    RequestActor(actor): RequestActor,
    body: Option<Json<TestEmailRequest>>,
) -> Response {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let recipient = req
        .email
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| actor.email.clone());

    match state.orchestrator.collaborators().notifier.send_test(&recipient).await {
        Ok(()) => ApiResponse::ok(serde_json::json!({ "sent": true, "recipient": recipient })),
        Err(NotifyError::NotConfigured) => {
            ApiErrorResponse::service_unavailable("e-mail transport is not configured")
        }
        Err(NotifyError::Config(msg)) => ApiErrorResponse::bad_request(msg),
        Err(e) => ApiErrorResponse::service_unavailable(e.to_string()),
    }
}

// ============================================================================
// Recommendation
// ============================================================================

/// POST /api/v1/recommendation
///
/// Recommends and verifies for the posted snapshot. Stage errors are
/// reported inside the payload; the cycle log and alerts are untouched.
pub async fn recommend(
    State(state): State<ApiState>,
    RequestActor(actor): RequestActor,
    Json(snapshot): Json<PlantSnapshot>,
) -> Response {
    let recommendation = state.orchestrator.recommend_for(&snapshot).await;
    ApiResponse::ok(RecommendationResponse {
        requested_by: actor.email,
        recommendation,
    })
}

// ============================================================================
// Classification and configuration
// ============================================================================

/// POST /api/v1/anomaly/classify
pub async fn classify(State(state): State<ApiState>, Json(snapshot): Json<PlantSnapshot>) -> Response {
    ApiResponse::ok(state.orchestrator.classify(&snapshot))
}

/// GET /api/v1/config/thresholds?plant_id=
pub async fn get_thresholds(
    State(state): State<ApiState>,
    Query(q): Query<ThresholdsQuery>,
) -> Response {
    let policy = state
        .orchestrator
        .collaborators()
        .thresholds
        .policy_for(q.plant_id.as_deref());
    ApiResponse::ok(policy)
}

/// GET /api/v1/config/baselines
pub async fn get_baselines(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.config.baselines)
}

// ============================================================================
// Plant state
// ============================================================================

/// GET /api/v1/state/latest
pub async fn latest_state(State(state): State<ApiState>) -> Response {
    match state.orchestrator.collaborators().telemetry.fetch_latest().await {
        Ok(Some(snapshot)) => ApiResponse::ok(snapshot),
        Ok(None) => ApiErrorResponse::not_found("no plant state available"),
        Err(e) => e.into_response(),
    }
}

/// GET /api/v1/state/history?limit=100&plant_id=&since=&until=
pub async fn state_history(State(state): State<ApiState>, Query(q): Query<HistoryQuery>) -> Response {
    let filter = HistoryFilter {
        plant_id: q.plant_id,
        since: q.since,
        until: q.until,
    };
    match state
        .orchestrator
        .collaborators()
        .telemetry
        .fetch_history(clamp_limit(q.limit, DEFAULT_HISTORY_LIMIT), &filter)
        .await
    {
        Ok(rows) => ApiResponse::ok(rows),
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// GET /api/v1/simulate/fuel
///
/// Sweeps the alternative-fuel share from the latest snapshot, or from an
/// empty one when no state is available.
pub async fn simulate_fuel(State(state): State<ApiState>) -> Response {
    let base = match state.orchestrator.collaborators().telemetry.fetch_latest().await {
        Ok(snapshot) => snapshot.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Latest state unavailable, simulating from defaults");
            PlantSnapshot::default()
        }
    };
    let sim = simulate_fuel_mix(&base, state.predictor().as_ref(), &DEFAULT_ALT_FUEL_STEPS, Utc::now()).await;
    ApiResponse::ok(sim)
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Response {
    let c = state.orchestrator.collaborators();
    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        plant: state.config.plant.name.clone(),
        recommender: c.recommender.client_name().to_string(),
        predictor: c.verifier.predictor().predictor_name().to_string(),
        notifications_configured: c.notifier.is_configured(),
        telemetry: c.telemetry.source_name().to_string(),
    })
}
