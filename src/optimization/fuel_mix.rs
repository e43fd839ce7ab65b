//! Alternative-fuel mix what-if simulation
//!
//! Sweeps the alternative-fuel share and estimates energy and CO2 for each
//! step. Predictions come from the energy model when it answers; otherwise a
//! linear heuristic is used. The heuristic is a rough planning aid, nothing
//! more.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::predictor::EnergyPredictor;
use crate::types::PlantSnapshot;

/// Alternative-fuel shares swept by default (percent).
pub const DEFAULT_ALT_FUEL_STEPS: [f64; 7] = [0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0];

/// Fractional energy reduction per percentage point of alternative fuel.
pub const ENERGY_REDUCTION_PER_ALT_PCT: f64 = 0.0025;

/// Base energy used by the heuristic when the snapshot has none (kWh/t).
pub const DEFAULT_BASE_ENERGY: f64 = 220.0;

const EMISSION_FACTOR_FOSSIL: f64 = 0.85;
const EMISSION_FACTOR_ALT: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateSource {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelMixPoint {
    pub alt_fuel_pct: f64,
    pub pred_energy_kwh_per_ton: f64,
    #[serde(rename = "emissions_kgCO2_per_ton")]
    pub emissions_kg_co2_per_ton: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelMixSimulation {
    pub source: EstimateSource,
    pub points: Vec<FuelMixPoint>,
}

/// Heuristic energy at a given alternative-fuel share.
pub fn heuristic_energy(base_energy: f64, alt_pct: f64) -> f64 {
    base_energy * (1.0 - ENERGY_REDUCTION_PER_ALT_PCT * alt_pct)
}

/// Blended CO2 emissions for an energy figure and fuel share.
pub fn emissions_for(energy: f64, alt_pct: f64) -> f64 {
    let alt = alt_pct / 100.0;
    energy * ((1.0 - alt) * EMISSION_FACTOR_FOSSIL + alt * EMISSION_FACTOR_ALT)
}

fn prepare_instance(base: &PlantSnapshot, alt_pct: f64, now: DateTime<Utc>) -> PlantSnapshot {
    let mut inst = base.clone();
    inst.set("alt_fuel_pct", alt_pct);
    inst.set("hour_of_day", f64::from(now.hour()));
    inst.set("day_of_week", f64::from(now.weekday().num_days_from_monday()));
    if inst.timestamp.is_none() {
        inst.timestamp = Some(now);
    }
    inst
}

/// Run the sweep over `steps`.
pub async fn simulate_fuel_mix(
    base: &PlantSnapshot,
    predictor: &dyn EnergyPredictor,
    steps: &[f64],
    now: DateTime<Utc>,
) -> FuelMixSimulation {
    let instances: Vec<_> = steps
        .iter()
        .map(|&pct| prepare_instance(base, pct, now))
        .collect();

    let (source, energies) = match predictor.predict_batch(&instances).await {
        Ok(e) if e.len() == steps.len() => (EstimateSource::Model, e),
        Ok(e) => {
            tracing::warn!(
                expected = steps.len(),
                got = e.len(),
                "Fuel-mix prediction count mismatch, using heuristic"
            );
            (EstimateSource::Heuristic, heuristic_sweep(base, steps))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Fuel-mix prediction failed, using heuristic");
            (EstimateSource::Heuristic, heuristic_sweep(base, steps))
        }
    };

    let points = steps
        .iter()
        .zip(energies)
        .map(|(&pct, energy)| FuelMixPoint {
            alt_fuel_pct: pct,
            pred_energy_kwh_per_ton: energy,
            emissions_kg_co2_per_ton: emissions_for(energy, pct),
        })
        .collect();

    FuelMixSimulation { source, points }
}

fn heuristic_sweep(base: &PlantSnapshot, steps: &[f64]) -> Vec<f64> {
    let base_energy = base
        .energy_use
        .filter(|e| e.is_finite())
        .unwrap_or(DEFAULT_BASE_ENERGY);
    steps
        .iter()
        .map(|&pct| heuristic_energy(base_energy, pct))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::PredictError;
    use async_trait::async_trait;

    struct Down;

    #[async_trait]
    impl EnergyPredictor for Down {
        async fn predict(&self, _: &PlantSnapshot) -> Result<f64, PredictError> {
            Err(PredictError::NotConfigured)
        }
        fn predictor_name(&self) -> &str {
            "down"
        }
    }

    /// Energy falls by one per alt-fuel percentage point from 200.
    struct Linear;

    #[async_trait]
    impl EnergyPredictor for Linear {
        async fn predict(&self, s: &PlantSnapshot) -> Result<f64, PredictError> {
            Ok(200.0 - s.get("alt_fuel_pct").unwrap_or(0.0))
        }
        fn predictor_name(&self) -> &str {
            "linear"
        }
    }

    #[tokio::test]
    async fn test_heuristic_fallback_uses_default_base() {
        let sim = simulate_fuel_mix(
            &PlantSnapshot::default(),
            &Down,
            &DEFAULT_ALT_FUEL_STEPS,
            Utc::now(),
        )
        .await;
        assert_eq!(sim.source, EstimateSource::Heuristic);
        assert_eq!(sim.points.len(), 7);
        assert!((sim.points[0].pred_energy_kwh_per_ton - 220.0).abs() < 1e-9);
        assert!((sim.points[0].emissions_kg_co2_per_ton - 187.0).abs() < 1e-9);
        // 220 * (1 - 0.15)
        assert!((sim.points[6].pred_energy_kwh_per_ton - 187.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_model_predictions_used_when_available() {
        let base = PlantSnapshot {
            energy_use: Some(150.0),
            ..Default::default()
        };
        let sim = simulate_fuel_mix(&base, &Linear, &[0.0, 50.0], Utc::now()).await;
        assert_eq!(sim.source, EstimateSource::Model);
        assert_eq!(sim.points[1].pred_energy_kwh_per_ton, 150.0);
        // 150 * (0.5 * 0.85 + 0.5 * 0.10)
        assert!((sim.points[1].emissions_kg_co2_per_ton - 71.25).abs() < 1e-9);
    }

    #[test]
    fn test_instance_carries_time_features() {
        let now = "2025-06-04T13:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let inst = prepare_instance(&PlantSnapshot::default(), 30.0, now);
        assert_eq!(inst.get("alt_fuel_pct"), Some(30.0));
        assert_eq!(inst.get("hour_of_day"), Some(13.0));
        // Wednesday
        assert_eq!(inst.get("day_of_week"), Some(2.0));
        assert_eq!(inst.timestamp, Some(now));
    }
}
