//! Savings verification against the independent energy model

use std::sync::Arc;

use super::predictor::EnergyPredictor;
use crate::types::PlantSnapshot;

/// Quantifies the energy delta of a candidate snapshot with an injected predictor.
#[derive(Clone)]
pub struct SavingsVerifier {
    predictor: Arc<dyn EnergyPredictor>,
}

impl SavingsVerifier {
    pub fn new(predictor: Arc<dyn EnergyPredictor>) -> Self {
        Self { predictor }
    }

    pub fn predictor(&self) -> &Arc<dyn EnergyPredictor> {
        &self.predictor
    }

    /// Percentage energy saving of `candidate` over `original`, rounded to 3 places.
    ///
    /// `None` when either prediction fails or the original prediction is not
    /// positive. Never an error: a failed verification only leaves the
    /// recommendation unverified.
    pub async fn verify(&self, original: &PlantSnapshot, candidate: &PlantSnapshot) -> Option<f64> {
        let (orig, cand) = match futures::future::try_join(
            self.predictor.predict(original),
            self.predictor.predict(candidate),
        )
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(
                    predictor = self.predictor.predictor_name(),
                    error = %e,
                    "Energy verification failed"
                );
                return None;
            }
        };

        saving_pct(orig, cand)
    }
}

fn saving_pct(orig: f64, cand: f64) -> Option<f64> {
    if !orig.is_finite() || !cand.is_finite() || orig <= 0.0 {
        return None;
    }
    let pct = 100.0 * (orig - cand) / orig;
    Some((pct * 1000.0).round() / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::PredictError;
    use async_trait::async_trait;

    /// Returns the snapshot's energy_use, or fails when it is absent.
    struct Echo;

    #[async_trait]
    impl EnergyPredictor for Echo {
        async fn predict(&self, s: &PlantSnapshot) -> Result<f64, PredictError> {
            s.energy_use.ok_or(PredictError::NotConfigured)
        }
        fn predictor_name(&self) -> &str {
            "echo"
        }
    }

    fn snap(energy: Option<f64>) -> PlantSnapshot {
        PlantSnapshot {
            energy_use: energy,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_identical_snapshots_save_nothing() {
        let v = SavingsVerifier::new(Arc::new(Echo));
        let s = snap(Some(163.7));
        assert_eq!(v.verify(&s, &s).await, Some(0.0));
    }

    #[tokio::test]
    async fn test_saving_rounded_to_three_places() {
        let v = SavingsVerifier::new(Arc::new(Echo));
        let pct = v.verify(&snap(Some(150.0)), &snap(Some(140.0))).await;
        assert_eq!(pct, Some(6.667));
    }

    #[tokio::test]
    async fn test_non_positive_original_is_unverifiable() {
        let v = SavingsVerifier::new(Arc::new(Echo));
        assert_eq!(v.verify(&snap(Some(0.0)), &snap(Some(10.0))).await, None);
        assert_eq!(v.verify(&snap(Some(-5.0)), &snap(Some(10.0))).await, None);
    }

    #[tokio::test]
    async fn test_prediction_failure_is_unverifiable() {
        let v = SavingsVerifier::new(Arc::new(Echo));
        assert_eq!(v.verify(&snap(Some(150.0)), &snap(None)).await, None);
    }
}
