//! Energy prediction model boundary
//!
//! The verification model is a black box: one snapshot in, one scalar energy
//! estimate out. The HTTP client speaks the common `{instances: [...]}` →
//! `{predictions: [...]}` serving shape.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::types::PlantSnapshot;

/// Errors from the energy predictor.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("predictor returned status {0}")]
    ServerError(reqwest::StatusCode),
    #[error("malformed prediction response: {0}")]
    Malformed(String),
    #[error("predictor not configured")]
    NotConfigured,
}

/// Independent energy-use model.
#[async_trait]
pub trait EnergyPredictor: Send + Sync {
    /// Predicted energy use for one snapshot.
    async fn predict(&self, snapshot: &PlantSnapshot) -> Result<f64, PredictError>;

    /// Predictions for several snapshots, in input order.
    async fn predict_batch(&self, instances: &[PlantSnapshot]) -> Result<Vec<f64>, PredictError> {
        futures::future::try_join_all(instances.iter().map(|s| self.predict(s))).await
    }

    /// Name for logging.
    fn predictor_name(&self) -> &str;
}

/// Pull a scalar out of one prediction entry.
///
/// Serving containers disagree on shape: a bare number, a numeric string, a
/// one-element list, or an object whose first numeric value is the estimate.
pub fn unwrap_prediction(value: &serde_json::Value) -> Option<f64> {
    use serde_json::Value;
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(items) => items.first().and_then(unwrap_prediction),
        Value::Object(map) => map.values().find_map(unwrap_prediction),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: &'a [PlantSnapshot],
}

/// HTTP client for a hosted prediction endpoint.
#[derive(Clone)]
pub struct HttpPredictor {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpPredictor {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PredictError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl EnergyPredictor for HttpPredictor {
    async fn predict(&self, snapshot: &PlantSnapshot) -> Result<f64, PredictError> {
        let mut values = self.predict_batch(std::slice::from_ref(snapshot)).await?;
        values
            .pop()
            .ok_or_else(|| PredictError::Malformed("empty predictions".to_string()))
    }

    async fn predict_batch(&self, instances: &[PlantSnapshot]) -> Result<Vec<f64>, PredictError> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .json(&PredictRequest { instances });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(PredictError::ServerError(resp.status()));
        }
        let body: serde_json::Value = resp.json().await?;
        let preds = body
            .get("predictions")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| PredictError::Malformed("missing 'predictions' array".to_string()))?;

        if preds.len() < instances.len() {
            return Err(PredictError::Malformed(format!(
                "expected {} predictions, got {}",
                instances.len(),
                preds.len()
            )));
        }

        preds
            .iter()
            .take(instances.len())
            .map(|p| {
                unwrap_prediction(p)
                    .ok_or_else(|| PredictError::Malformed(format!("non-numeric prediction: {p}")))
            })
            .collect()
    }

    fn predictor_name(&self) -> &str {
        "http"
    }
}

/// Stand-in used when no prediction endpoint is configured.
pub struct DisabledPredictor;

#[async_trait]
impl EnergyPredictor for DisabledPredictor {
    async fn predict(&self, _snapshot: &PlantSnapshot) -> Result<f64, PredictError> {
        Err(PredictError::NotConfigured)
    }

    fn predictor_name(&self) -> &str {
        "disabled"
    }
}
