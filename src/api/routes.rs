//! API route table
//!
//! - /api/v1/cycle/run, /api/v1/cycles/recent
//! - /api/v1/alerts/* (list, acknowledge, check triggers, test e-mail)
//! - /api/v1/recommendation
//! - /api/v1/anomaly/classify
//! - /api/v1/config/thresholds, /api/v1/config/baselines
//! - /api/v1/state/latest, /api/v1/state/history
//! - /api/v1/simulate/fuel

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};

/// Build the v1 API router.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        // Cycle
        .route("/cycle/run", post(handlers::run_cycle))
        .route("/cycles/recent", get(handlers::recent_cycles))
        // Alerts
        .route("/alerts/recent", get(handlers::recent_alerts))
        .route("/alerts/acknowledge", post(handlers::acknowledge_alert))
        .route("/alerts/check-now", post(handlers::check_now))
        .route("/alerts/scheduled-check", post(handlers::scheduled_check))
        .route("/alerts/test-email", post(handlers::test_email))
        // Ad-hoc recommendation
        .route("/recommendation", post(handlers::recommend))
        // Classification
        .route("/anomaly/classify", post(handlers::classify))
        // Config
        .route("/config/thresholds", get(handlers::get_thresholds))
        .route("/config/baselines", get(handlers::get_baselines))
        // Plant state
        .route("/state/latest", get(handlers::latest_state))
        .route("/state/history", get(handlers::state_history))
        // Simulation
        .route("/simulate/fuel", get(handlers::simulate_fuel))
        .with_state(state)
}

/// Health endpoint at root level
pub fn root_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .with_state(state)
}
