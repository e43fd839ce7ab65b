//! Plant Configuration Module
//!
//! Operator-tunable values loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `CEMENT_OPS_CONFIG` environment variable (path to TOML file)
//! 2. `plant_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is passed explicitly to whoever needs it; there is no
//! process-wide instance.

mod plant_config;
pub mod validation;

pub use plant_config::*;
