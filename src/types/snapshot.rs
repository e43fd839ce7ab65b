//! PlantSnapshot: one point-in-time reading of the monitored plant parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Parameter;

/// One timestamped reading of the plant.
///
/// The monitored parameters are typed optional fields. A missing field is a
/// valid state: the classifier treats it as a sentinel that never crosses a
/// threshold. Any additional numeric columns from the telemetry source (e.g.
/// `alt_fuel_pct`) are preserved in `extra` so they round-trip to the
/// recommender and predictor unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlantSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plant_id: Option<String>,

    // Raw mix fractions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw1_frac: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw2_frac: Option<f64>,

    // Monitored parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grinding_efficiency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kiln_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_use: Option<f64>,
    #[serde(rename = "emissions_CO2", default, skip_serializing_if = "Option::is_none")]
    pub emissions_co2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_quality_index: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_rate: Option<f64>,

    /// Any other columns delivered by the telemetry source.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PlantSnapshot {
    /// Value of a monitored parameter.
    pub fn monitored(&self, param: Parameter) -> Option<f64> {
        match param {
            Parameter::GrindingEfficiency => self.grinding_efficiency,
            Parameter::KilnTemp => self.kiln_temp,
            Parameter::EnergyUse => self.energy_use,
            Parameter::EmissionsCo2 => self.emissions_co2,
            Parameter::ProductQualityIndex => self.product_quality_index,
            Parameter::FanSpeed => self.fan_speed,
            Parameter::FeedRate => self.feed_rate,
        }
    }

    /// Numeric value of any field by its wire name.
    pub fn get(&self, name: &str) -> Option<f64> {
        match self.typed_slot(name) {
            Some(slot) => slot,
            None => self.extra.get(name).and_then(serde_json::Value::as_f64),
        }
    }

    /// Overwrite a field by its wire name. Unknown names land in `extra`.
    pub fn set(&mut self, name: &str, value: f64) {
        if let Some(slot) = self.typed_slot_mut(name) {
            *slot = Some(value);
        } else {
            self.extra.insert(name.to_string(), serde_json::Value::from(value));
        }
    }

    /// Names of required fields that are absent or non-finite.
    pub fn missing_fields(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.get(name).is_some_and(f64::is_finite))
            .cloned()
            .collect()
    }

    fn typed_slot(&self, name: &str) -> Option<Option<f64>> {
        let value = match name {
            "raw1_frac" => self.raw1_frac,
            "raw2_frac" => self.raw2_frac,
            "grinding_efficiency" => self.grinding_efficiency,
            "kiln_temp" => self.kiln_temp,
            "energy_use" => self.energy_use,
            "emissions_CO2" => self.emissions_co2,
            "product_quality_index" => self.product_quality_index,
            "fan_speed" => self.fan_speed,
            "feed_rate" => self.feed_rate,
            _ => return None,
        };
        Some(value)
    }

    fn typed_slot_mut(&mut self, name: &str) -> Option<&mut Option<f64>> {
        match name {
            "raw1_frac" => Some(&mut self.raw1_frac),
            "raw2_frac" => Some(&mut self.raw2_frac),
            "grinding_efficiency" => Some(&mut self.grinding_efficiency),
            "kiln_temp" => Some(&mut self.kiln_temp),
            "energy_use" => Some(&mut self.energy_use),
            "emissions_CO2" => Some(&mut self.emissions_co2),
            "product_quality_index" => Some(&mut self.product_quality_index),
            "fan_speed" => Some(&mut self.fan_speed),
            "feed_rate" => Some(&mut self.feed_rate),
            _ => None,
        }
    }
}
