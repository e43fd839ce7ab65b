//! Recommendation Client Module
//!
//! Boundary to the generative recommendation engine. The engine is a black
//! box: a plant snapshot goes in, a candidate set of parameter adjustments
//! comes out.
//!
//! ## Layout
//!
//! - [`RecommendationClient`]: the trait the orchestrator depends on
//! - [`HttpRecommender`]: hosted-model client over HTTPS
//! - [`parse_recommendation`]: lenient parser for raw model output

use async_trait::async_trait;

mod client;
mod parsing;

pub use client::{build_prompt, HttpRecommender};
pub use parsing::parse_recommendation;

use crate::types::{PlantSnapshot, Recommendation};

/// Recommender errors
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("recommender returned status {0}")]
    ServerError(reqwest::StatusCode),
    #[error("malformed recommendation: {0}")]
    Malformed(String),
    #[error("recommender not configured")]
    NotConfigured,
}

/// Source of candidate parameter adjustments.
#[async_trait]
pub trait RecommendationClient: Send + Sync {
    /// Ask for adjustments to the given state.
    async fn recommend(&self, snapshot: &PlantSnapshot) -> Result<Recommendation, RecommendError>;

    /// Name for logging.
    fn client_name(&self) -> &str;
}

/// Stand-in used when no recommender credentials are configured.
///
/// Every call fails with [`RecommendError::NotConfigured`], which the
/// orchestrator folds into a degraded result.
pub struct DisabledRecommender;

#[async_trait]
impl RecommendationClient for DisabledRecommender {
    async fn recommend(&self, _snapshot: &PlantSnapshot) -> Result<Recommendation, RecommendError> {
        Err(RecommendError::NotConfigured)
    }

    fn client_name(&self) -> &str {
        "disabled"
    }
}
