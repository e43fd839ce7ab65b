//! Monitored parameters and their critical/warning bounds

use serde::{Deserialize, Serialize};

/// The seven parameters the anomaly classifier watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    #[serde(rename = "grinding_efficiency")]
    GrindingEfficiency,
    #[serde(rename = "kiln_temp")]
    KilnTemp,
    #[serde(rename = "energy_use")]
    EnergyUse,
    #[serde(rename = "emissions_CO2")]
    EmissionsCo2,
    #[serde(rename = "product_quality_index")]
    ProductQualityIndex,
    #[serde(rename = "fan_speed")]
    FanSpeed,
    #[serde(rename = "feed_rate")]
    FeedRate,
}

impl Parameter {
    /// Evaluation order. Anomaly tags are emitted in this order within each tier.
    pub const ALL: [Self; 7] = [
        Self::GrindingEfficiency,
        Self::KilnTemp,
        Self::EnergyUse,
        Self::EmissionsCo2,
        Self::ProductQualityIndex,
        Self::FanSpeed,
        Self::FeedRate,
    ];

    /// Wire name used by the telemetry source.
    pub const fn key(self) -> &'static str {
        match self {
            Self::GrindingEfficiency => "grinding_efficiency",
            Self::KilnTemp => "kiln_temp",
            Self::EnergyUse => "energy_use",
            Self::EmissionsCo2 => "emissions_CO2",
            Self::ProductQualityIndex => "product_quality_index",
            Self::FanSpeed => "fan_speed",
            Self::FeedRate => "feed_rate",
        }
    }

    /// Human-readable label for notifications.
    pub const fn label(self) -> &'static str {
        match self {
            Self::GrindingEfficiency => "Grinding Efficiency",
            Self::KilnTemp => "Kiln Temperature",
            Self::EnergyUse => "Energy Use",
            Self::EmissionsCo2 => "Emissions (CO2)",
            Self::ProductQualityIndex => "Product Quality",
            Self::FanSpeed => "Fan Speed",
            Self::FeedRate => "Feed Rate",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::GrindingEfficiency | Self::FanSpeed => "%",
            Self::KilnTemp => "°C",
            Self::EnergyUse => "kWh/ton",
            Self::EmissionsCo2 => "kg/ton",
            Self::ProductQualityIndex => "",
            Self::FeedRate => "tons/hr",
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Optional two-tier bounds for one parameter.
///
/// An absent bound is never checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_max: Option<f64>,
}

impl ParameterBounds {
    pub const NONE: Self = Self {
        critical_min: None,
        warning_min: None,
        warning_max: None,
        critical_max: None,
    };

    /// Bounds where low values are bad.
    pub const fn low(critical_min: f64, warning_min: f64) -> Self {
        Self {
            critical_min: Some(critical_min),
            warning_min: Some(warning_min),
            ..Self::NONE
        }
    }

    /// Bounds where high values are bad.
    pub const fn high(warning_max: f64, critical_max: f64) -> Self {
        Self {
            warning_max: Some(warning_max),
            critical_max: Some(critical_max),
            ..Self::NONE
        }
    }

    /// Warning-only band.
    pub const fn band(warning_min: f64, warning_max: f64) -> Self {
        Self {
            warning_min: Some(warning_min),
            warning_max: Some(warning_max),
            ..Self::NONE
        }
    }

    /// Take every bound present in `other`, keep ours otherwise.
    #[must_use]
    pub fn overlay(&self, other: &Self) -> Self {
        Self {
            critical_min: other.critical_min.or(self.critical_min),
            warning_min: other.warning_min.or(self.warning_min),
            warning_max: other.warning_max.or(self.warning_max),
            critical_max: other.critical_max.or(self.critical_max),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.critical_min.is_none()
            && self.warning_min.is_none()
            && self.warning_max.is_none()
            && self.critical_max.is_none()
    }
}

/// Resolved per-parameter bounds used by the classifier.
///
/// The process-wide default is [`DEFAULT_POLICY`]; it is a constant and never
/// changes at runtime. Per-plant policies are derived from it with
/// [`ThresholdPolicy::with_overrides`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    pub grinding_efficiency: ParameterBounds,
    pub kiln_temp: ParameterBounds,
    pub energy_use: ParameterBounds,
    #[serde(rename = "emissions_CO2")]
    pub emissions_co2: ParameterBounds,
    pub product_quality_index: ParameterBounds,
    pub fan_speed: ParameterBounds,
    pub feed_rate: ParameterBounds,
}

/// Default anomaly thresholds.
pub const DEFAULT_POLICY: ThresholdPolicy = ThresholdPolicy {
    grinding_efficiency: ParameterBounds::low(82.0, 88.0),
    kiln_temp: ParameterBounds {
        critical_min: None,
        warning_min: Some(1400.0),
        warning_max: Some(1480.0),
        critical_max: Some(1500.0),
    },
    energy_use: ParameterBounds::high(160.0, 170.0),
    emissions_co2: ParameterBounds::high(110.0, 120.0),
    product_quality_index: ParameterBounds::low(75.0, 80.0),
    fan_speed: ParameterBounds::band(65.0, 85.0),
    feed_rate: ParameterBounds::band(90.0, 120.0),
};

impl ThresholdPolicy {
    pub const fn bounds(&self, param: Parameter) -> &ParameterBounds {
        match param {
            Parameter::GrindingEfficiency => &self.grinding_efficiency,
            Parameter::KilnTemp => &self.kiln_temp,
            Parameter::EnergyUse => &self.energy_use,
            Parameter::EmissionsCo2 => &self.emissions_co2,
            Parameter::ProductQualityIndex => &self.product_quality_index,
            Parameter::FanSpeed => &self.fan_speed,
            Parameter::FeedRate => &self.feed_rate,
        }
    }

    /// Derive a policy where every bound present in `overrides` replaces ours.
    ///
    /// Overrides cannot remove a bound, only move it.
    #[must_use]
    pub fn with_overrides(&self, overrides: &ThresholdOverrides) -> Self {
        Self {
            grinding_efficiency: self.grinding_efficiency.overlay(&overrides.grinding_efficiency),
            kiln_temp: self.kiln_temp.overlay(&overrides.kiln_temp),
            energy_use: self.energy_use.overlay(&overrides.energy_use),
            emissions_co2: self.emissions_co2.overlay(&overrides.emissions_co2),
            product_quality_index: self
                .product_quality_index
                .overlay(&overrides.product_quality_index),
            fan_speed: self.fan_speed.overlay(&overrides.fan_speed),
            feed_rate: self.feed_rate.overlay(&overrides.feed_rate),
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        DEFAULT_POLICY
    }
}

/// Partial bounds supplied by configuration or an API caller.
///
/// Every field defaults to "no override".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdOverrides {
    pub grinding_efficiency: ParameterBounds,
    pub kiln_temp: ParameterBounds,
    pub energy_use: ParameterBounds,
    #[serde(rename = "emissions_CO2")]
    pub emissions_co2: ParameterBounds,
    pub product_quality_index: ParameterBounds,
    pub fan_speed: ParameterBounds,
    pub feed_rate: ParameterBounds,
}

impl ThresholdOverrides {
    pub const fn bounds(&self, param: Parameter) -> &ParameterBounds {
        match param {
            Parameter::GrindingEfficiency => &self.grinding_efficiency,
            Parameter::KilnTemp => &self.kiln_temp,
            Parameter::EnergyUse => &self.energy_use,
            Parameter::EmissionsCo2 => &self.emissions_co2,
            Parameter::ProductQualityIndex => &self.product_quality_index,
            Parameter::FanSpeed => &self.fan_speed,
            Parameter::FeedRate => &self.feed_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        Parameter::ALL.iter().all(|p| self.bounds(*p).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_values() {
        let p = ThresholdPolicy::default();
        assert_eq!(p.grinding_efficiency.critical_min, Some(82.0));
        assert_eq!(p.grinding_efficiency.warning_min, Some(88.0));
        assert_eq!(p.kiln_temp.critical_max, Some(1500.0));
        assert_eq!(p.kiln_temp.warning_max, Some(1480.0));
        assert_eq!(p.kiln_temp.warning_min, Some(1400.0));
        assert_eq!(p.energy_use.critical_max, Some(170.0));
        assert_eq!(p.energy_use.warning_max, Some(160.0));
        assert_eq!(p.emissions_co2.critical_max, Some(120.0));
        assert_eq!(p.emissions_co2.warning_max, Some(110.0));
        assert_eq!(p.product_quality_index.critical_min, Some(75.0));
        assert_eq!(p.product_quality_index.warning_min, Some(80.0));
        assert_eq!(p.fan_speed, ParameterBounds::band(65.0, 85.0));
        assert_eq!(p.feed_rate, ParameterBounds::band(90.0, 120.0));
    }

    #[test]
    fn test_overrides_replace_only_present_bounds() {
        let overrides: ThresholdOverrides = toml::from_str(
            r#"
            [kiln_temp]
            critical_max = 1520.0
            "#,
        )
        .unwrap();
        let p = DEFAULT_POLICY.with_overrides(&overrides);
        assert_eq!(p.kiln_temp.critical_max, Some(1520.0));
        assert_eq!(p.kiln_temp.warning_max, Some(1480.0));
        assert_eq!(p.energy_use, DEFAULT_POLICY.energy_use);
    }

    #[test]
    fn test_policy_serializes_with_wire_names() {
        let v = serde_json::to_value(DEFAULT_POLICY).unwrap();
        assert_eq!(v["emissions_CO2"]["critical_max"], 120.0);
        assert!(v["fan_speed"].get("critical_max").is_none());
    }

    #[test]
    fn test_empty_overrides() {
        assert!(ThresholdOverrides::default().is_empty());
    }
}
