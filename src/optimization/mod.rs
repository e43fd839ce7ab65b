//! Recommendation Verification Engine
//!
//! Turns a recommender's candidate set into a candidate snapshot and checks the
//! claimed benefit against an independent energy model. Also hosts the
//! alternative-fuel what-if sweep, which reuses the same model.

mod candidate;
pub mod fuel_mix;
mod predictor;
mod verifier;

pub use candidate::build_candidate;
pub use fuel_mix::{simulate_fuel_mix, EstimateSource, FuelMixPoint, FuelMixSimulation};
pub use predictor::{
    unwrap_prediction, DisabledPredictor, EnergyPredictor, HttpPredictor, PredictError,
};
pub use verifier::SavingsVerifier;
