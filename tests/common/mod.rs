//! Shared fixtures for the integration tests: snapshots, mock collaborators
//! and an orchestrator wired to in-memory stores.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cement_ops::anomaly::StaticThresholds;
use cement_ops::llm::{RecommendError, RecommendationClient};
use cement_ops::notify::{
    MailMessage, MailTransport, NotificationDispatcher, NotifyError, StaticUserDirectory, UserEntry,
};
use cement_ops::optimization::{EnergyPredictor, PredictError, SavingsVerifier};
use cement_ops::pipeline::{Collaborators, CycleOrchestrator, OrchestratorSettings};
use cement_ops::storage::{AlertStore, CycleLog, InMemoryAlertStore, InMemoryCycleLog, StorageError};
use cement_ops::telemetry::InMemoryTelemetry;
use cement_ops::types::{
    AckOutcome, Action, Alert, CandidateChange, CycleRecord, PlantSnapshot, Recommendation, Role,
    Severity,
};
use chrono::{DateTime, Utc};

pub const ADMIN: &str = "admin@plant.example";
pub const OPERATOR: &str = "operator@plant.example";

// ============================================================================
// Snapshots
// ============================================================================

/// Every monitored value inside its band.
pub fn nominal() -> PlantSnapshot {
    PlantSnapshot {
        raw1_frac: Some(0.62),
        raw2_frac: Some(0.38),
        grinding_efficiency: Some(90.0),
        kiln_temp: Some(1450.0),
        energy_use: Some(150.0),
        emissions_co2: Some(100.0),
        product_quality_index: Some(85.0),
        fan_speed: Some(80.0),
        feed_rate: Some(100.0),
        ..PlantSnapshot::default()
    }
}

/// Kiln above its critical bound.
pub fn critical() -> PlantSnapshot {
    PlantSnapshot {
        kiln_temp: Some(1510.0),
        ..nominal()
    }
}

/// Feed rate above its warning band.
pub fn warning() -> PlantSnapshot {
    PlantSnapshot {
        feed_rate: Some(125.0),
        ..nominal()
    }
}

// ============================================================================
// Mock collaborators
// ============================================================================

pub struct ScriptedRecommender {
    response: Result<Recommendation, String>,
    pub calls: AtomicUsize,
}

impl ScriptedRecommender {
    /// Lowers the fan speed to 71.
    pub fn fan_down() -> Self {
        Self::returning(Recommendation {
            recommendations: vec![CandidateChange {
                parameter: "fan_speed".to_string(),
                action: Action::Decrease,
                new_value: 71.0,
            }],
            estimated_saving_pct: Some(4.0),
            ..Recommendation::default()
        })
    }

    pub fn returning(rec: Recommendation) -> Self {
        Self {
            response: Ok(rec),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            response: Err(msg.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecommendationClient for ScriptedRecommender {
    async fn recommend(&self, _snapshot: &PlantSnapshot) -> Result<Recommendation, RecommendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(RecommendError::Malformed)
    }

    fn client_name(&self) -> &str {
        "scripted"
    }
}

/// Predicts `100 + fan_speed` kWh/t.
pub struct FanPredictor;

#[async_trait]
impl EnergyPredictor for FanPredictor {
    async fn predict(&self, snapshot: &PlantSnapshot) -> Result<f64, PredictError> {
        snapshot
            .fan_speed
            .map(|f| 100.0 + f)
            .ok_or_else(|| PredictError::Malformed("fan_speed missing".to_string()))
    }

    fn predictor_name(&self) -> &str {
        "fan"
    }
}

#[derive(Default)]
pub struct CaptureTransport {
    pub sent: Mutex<Vec<MailMessage>>,
}

impl CaptureTransport {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<MailMessage> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MailTransport for CaptureTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "capture"
    }
}

/// Transport whose sends always fail.
#[derive(Default)]
pub struct FailingTransport {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl MailTransport for FailingTransport {
    async fn send(&self, _message: &MailMessage) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Smtp("connection refused".to_string()))
    }

    fn transport_name(&self) -> &str {
        "failing"
    }
}

/// Alert store whose inserts always fail.
pub struct BrokenAlertStore;

impl AlertStore for BrokenAlertStore {
    fn create(&self, _alert: &Alert) -> Result<String, StorageError> {
        Err(StorageError::Database("alert tree unavailable".to_string()))
    }

    fn get(&self, _id: &str) -> Result<Option<Alert>, StorageError> {
        Ok(None)
    }

    fn list(&self, _limit: usize, _severity: Option<Severity>) -> Result<Vec<Alert>, StorageError> {
        Ok(Vec::new())
    }

    fn acknowledge(
        &self,
        _id: &str,
        _actor: &str,
        _at: DateTime<Utc>,
    ) -> Result<AckOutcome, StorageError> {
        Ok(AckOutcome::NotFound)
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

/// Cycle log whose writes always fail.
pub struct BrokenCycleLog;

impl CycleLog for BrokenCycleLog {
    fn record(&self, _record: &CycleRecord) -> Result<(), StorageError> {
        Err(StorageError::Database("disk full".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<CycleRecord>, StorageError> {
        Ok(Vec::new())
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub orchestrator: Arc<CycleOrchestrator>,
    pub telemetry: Arc<InMemoryTelemetry>,
    pub alerts: Arc<InMemoryAlertStore>,
    pub recommender: Arc<ScriptedRecommender>,
    pub mail: Arc<CaptureTransport>,
}

pub fn users() -> Vec<UserEntry> {
    vec![
        UserEntry {
            email: ADMIN.to_string(),
            role: Role::Admin,
            email_notifications: true,
        },
        UserEntry {
            email: OPERATOR.to_string(),
            role: Role::Operator,
            email_notifications: true,
        },
    ]
}

/// Collaborators a test may swap out. Unset fields use the in-memory
/// defaults held by [`Harness`].
#[derive(Default)]
pub struct Wiring {
    pub cycles: Option<Arc<dyn CycleLog>>,
    pub alerts: Option<Arc<dyn AlertStore>>,
    pub predictor: Option<Arc<dyn EnergyPredictor>>,
    pub transport: Option<Arc<dyn MailTransport>>,
    /// Replaces the dispatcher built over `transport`.
    pub notifier: Option<Arc<NotificationDispatcher>>,
}

/// Wire an orchestrator over in-memory collaborators. `customize` may
/// attach a dedup policy or access rules.
pub fn build(
    rows: Vec<PlantSnapshot>,
    recommender: ScriptedRecommender,
    wiring: Wiring,
    customize: impl FnOnce(CycleOrchestrator) -> CycleOrchestrator,
) -> Harness {
    let telemetry = Arc::new(InMemoryTelemetry::new(rows));
    let alerts = Arc::new(InMemoryAlertStore::new());
    let recommender = Arc::new(recommender);
    let mail = Arc::new(CaptureTransport::default());
    let transport = wiring
        .transport
        .unwrap_or_else(|| mail.clone() as Arc<dyn MailTransport>);
    let notifier = match wiring.notifier {
        Some(n) => n,
        None => Arc::new(
            NotificationDispatcher::new(
                Some(transport),
                Arc::new(StaticUserDirectory::new(users())),
            )
            .unwrap(),
        ),
    };

    let predictor = wiring
        .predictor
        .unwrap_or_else(|| Arc::new(FanPredictor) as Arc<dyn EnergyPredictor>);

    let c = Collaborators {
        telemetry: telemetry.clone(),
        thresholds: Arc::new(StaticThresholds::default()),
        recommender: recommender.clone(),
        verifier: SavingsVerifier::new(predictor),
        alerts: wiring
            .alerts
            .unwrap_or_else(|| alerts.clone() as Arc<dyn AlertStore>),
        cycles: wiring
            .cycles
            .unwrap_or_else(|| Arc::new(InMemoryCycleLog::default()) as Arc<dyn CycleLog>),
        notifier,
    };

    Harness {
        orchestrator: Arc::new(customize(CycleOrchestrator::new(c, OrchestratorSettings::default()))),
        telemetry,
        alerts,
        recommender,
        mail,
    }
}

/// Orchestrator over in-memory stores with default settings.
pub fn harness(rows: Vec<PlantSnapshot>, recommender: ScriptedRecommender) -> Harness {
    build(rows, recommender, Wiring::default(), |o| o)
}
