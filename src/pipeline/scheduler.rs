//! Periodic trigger for the anomaly check or the full cycle

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{CycleError, CycleOrchestrator};
use crate::types::Trigger;

/// What the scheduler runs on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    #[default]
    AnomalyCheck,
    FullCycle,
}

impl std::fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnomalyCheck => f.write_str("anomaly_check"),
            Self::FullCycle => f.write_str("full_cycle"),
        }
    }
}

/// Run one scheduled tick.
pub async fn run_tick(orchestrator: &CycleOrchestrator, mode: ScheduleMode) -> Result<(), CycleError> {
    match mode {
        ScheduleMode::AnomalyCheck => orchestrator.detect_anomalies().await.map(|_| ()),
        ScheduleMode::FullCycle => orchestrator.run_cycle(&Trigger::Scheduler).await.map(|_| ()),
    }
}

/// Tick every `period` until cancelled. The first tick fires one period after start.
pub async fn run_scheduler(
    orchestrator: Arc<CycleOrchestrator>,
    period: Duration,
    mode: ScheduleMode,
    cancel: CancellationToken,
) {
    info!(interval_secs = period.as_secs(), mode = %mode, "Scheduler started");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Scheduler shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = run_tick(&orchestrator, mode).await {
                    warn!(mode = %mode, error = %e, "Scheduled run failed");
                }
            }
        }
    }
}
