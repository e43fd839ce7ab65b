//! Anomaly Classifier - multi-tier threshold checks on a plant snapshot
//!
//! Each monitored parameter is checked in a fixed order and contributes at
//! most one tag:
//!
//! 1. critical above `critical_max`
//! 2. critical below `critical_min`
//! 3. warning above `warning_max`
//! 4. warning below `warning_min`
//!
//! The first check that fires wins, so a critical tag always suppresses the
//! warning tag for the same parameter. A check only runs when the parameter
//! defines a tag for that direction and the policy supplies the bound, which
//! gives "low is bad" parameters (grinding efficiency, product quality), "high
//! is bad" parameters (energy, emissions) and two-sided bands (kiln
//! temperature, fan speed, feed rate) from one table.
//!
//! A missing or non-finite value never crosses a bound.

mod policy;

pub use policy::{StaticThresholds, ThresholdProvider};

use crate::types::{
    AnomalyReport, AnomalyTag, Parameter, ParameterBounds, PlantSnapshot, ThresholdPolicy,
    DEFAULT_POLICY,
};

/// Tags a parameter emits per check direction. `None` disables the check.
struct TagSet {
    critical_high: Option<AnomalyTag>,
    critical_low: Option<AnomalyTag>,
    warning_high: Option<AnomalyTag>,
    warning_low: Option<AnomalyTag>,
}

const fn tag_set(param: Parameter) -> TagSet {
    use AnomalyTag as T;
    match param {
        Parameter::GrindingEfficiency => TagSet {
            critical_high: None,
            critical_low: Some(T::LowGrindingEfficiency),
            warning_high: None,
            warning_low: Some(T::SuboptimalGrindingEfficiency),
        },
        Parameter::KilnTemp => TagSet {
            critical_high: Some(T::HighKilnTemp),
            critical_low: None,
            warning_high: Some(T::ElevatedKilnTemp),
            warning_low: Some(T::LowKilnTemp),
        },
        Parameter::EnergyUse => TagSet {
            critical_high: Some(T::HighEnergyConsumption),
            critical_low: None,
            warning_high: Some(T::ElevatedEnergyConsumption),
            warning_low: None,
        },
        Parameter::EmissionsCo2 => TagSet {
            critical_high: Some(T::HighEmissions),
            critical_low: None,
            warning_high: Some(T::ElevatedEmissions),
            warning_low: None,
        },
        Parameter::ProductQualityIndex => TagSet {
            critical_high: None,
            critical_low: Some(T::LowProductQuality),
            warning_high: None,
            warning_low: Some(T::SuboptimalProductQuality),
        },
        Parameter::FanSpeed => TagSet {
            critical_high: Some(T::CriticalHighFanSpeed),
            critical_low: Some(T::CriticalLowFanSpeed),
            warning_high: Some(T::HighFanSpeed),
            warning_low: Some(T::LowFanSpeed),
        },
        Parameter::FeedRate => TagSet {
            critical_high: Some(T::CriticalHighFeedRate),
            critical_low: Some(T::CriticalLowFeedRate),
            warning_high: Some(T::HighFeedRate),
            warning_low: Some(T::LowFeedRate),
        },
    }
}

/// Tier a single parameter check landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    Critical(AnomalyTag),
    Warning(AnomalyTag),
}

fn above(value: f64, bound: Option<f64>, tag: Option<AnomalyTag>) -> Option<AnomalyTag> {
    match (bound, tag) {
        (Some(b), Some(t)) if value > b => Some(t),
        _ => None,
    }
}

fn below(value: f64, bound: Option<f64>, tag: Option<AnomalyTag>) -> Option<AnomalyTag> {
    match (bound, tag) {
        (Some(b), Some(t)) if value < b => Some(t),
        _ => None,
    }
}

fn check_parameter(param: Parameter, value: Option<f64>, bounds: &ParameterBounds) -> Option<Hit> {
    let value = value.filter(|v| v.is_finite())?;
    let tags = tag_set(param);

    if let Some(t) = above(value, bounds.critical_max, tags.critical_high)
        .or_else(|| below(value, bounds.critical_min, tags.critical_low))
    {
        return Some(Hit::Critical(t));
    }
    above(value, bounds.warning_max, tags.warning_high)
        .or_else(|| below(value, bounds.warning_min, tags.warning_low))
        .map(Hit::Warning)
}

/// Classify a snapshot against a threshold policy.
///
/// Pure and total: the same snapshot and policy always give the same report.
pub fn classify(snapshot: &PlantSnapshot, policy: &ThresholdPolicy) -> AnomalyReport {
    let mut critical = Vec::new();
    let mut warning = Vec::new();

    for param in Parameter::ALL {
        match check_parameter(param, snapshot.monitored(param), policy.bounds(param)) {
            Some(Hit::Critical(tag)) => critical.push(tag),
            Some(Hit::Warning(tag)) => warning.push(tag),
            None => {}
        }
    }

    AnomalyReport::from_tiers(critical, warning)
}

/// Classify against [`DEFAULT_POLICY`].
pub fn classify_default(snapshot: &PlantSnapshot) -> AnomalyReport {
    classify(snapshot, &DEFAULT_POLICY)
}

/// Underscore-separated identifier to title case: `high_kiln_temp` → `High Kiln Temp`.
pub fn format_anomaly_name(tag: &str) -> String {
    tag.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn snapshot(ge: f64, kt: f64, eu: f64, co2: f64, pq: f64, fs: f64, fr: f64) -> PlantSnapshot {
        PlantSnapshot {
            grinding_efficiency: Some(ge),
            kiln_temp: Some(kt),
            energy_use: Some(eu),
            emissions_co2: Some(co2),
            product_quality_index: Some(pq),
            fan_speed: Some(fs),
            feed_rate: Some(fr),
            ..Default::default()
        }
    }

    fn nominal() -> PlantSnapshot {
        snapshot(92.0, 1440.0, 150.0, 100.0, 85.0, 75.0, 105.0)
    }

    #[test]
    fn test_low_grinding_efficiency_is_critical() {
        let r = classify_default(&snapshot(80.0, 1450.0, 150.0, 100.0, 85.0, 75.0, 100.0));
        assert_eq!(r.anomalies(), &[AnomalyTag::LowGrindingEfficiency]);
        assert_eq!(r.severity(), Severity::Critical);
        assert!(r.anomaly_flag());
    }

    #[test]
    fn test_elevated_kiln_and_energy_are_warnings() {
        let r = classify_default(&snapshot(90.0, 1490.0, 165.0, 100.0, 85.0, 75.0, 100.0));
        assert_eq!(
            r.anomalies(),
            &[AnomalyTag::ElevatedKilnTemp, AnomalyTag::ElevatedEnergyConsumption]
        );
        assert_eq!(r.severity(), Severity::Warning);
        assert!(r.critical_anomalies().is_empty());
    }

    #[test]
    fn test_nominal_snapshot_is_normal() {
        let r = classify_default(&nominal());
        assert!(!r.anomaly_flag());
        assert_eq!(r.severity(), Severity::Normal);
        assert!(r.anomalies().is_empty());
    }

    #[test]
    fn test_critical_suppresses_warning_for_same_parameter() {
        let mut s = nominal();
        s.kiln_temp = Some(1510.0);
        s.energy_use = Some(180.0);
        s.grinding_efficiency = Some(70.0);
        let r = classify_default(&s);
        assert_eq!(
            r.critical_anomalies(),
            &[
                AnomalyTag::LowGrindingEfficiency,
                AnomalyTag::HighKilnTemp,
                AnomalyTag::HighEnergyConsumption
            ]
        );
        assert!(r.warning_anomalies().is_empty());
    }

    #[test]
    fn test_kiln_three_way_order() {
        let mut s = nominal();
        s.kiln_temp = Some(1380.0);
        assert_eq!(classify_default(&s).anomalies(), &[AnomalyTag::LowKilnTemp]);
        s.kiln_temp = Some(1481.0);
        assert_eq!(classify_default(&s).anomalies(), &[AnomalyTag::ElevatedKilnTemp]);
        s.kiln_temp = Some(1500.0);
        // Bounds are strict: exactly at critical_max is only a warning.
        assert_eq!(classify_default(&s).anomalies(), &[AnomalyTag::ElevatedKilnTemp]);
    }

    #[test]
    fn test_critical_first_ordering_across_parameters() {
        let mut s = nominal();
        s.fan_speed = Some(90.0);
        s.emissions_co2 = Some(125.0);
        let r = classify_default(&s);
        assert_eq!(r.anomalies(), &[AnomalyTag::HighEmissions, AnomalyTag::HighFanSpeed]);
        assert_eq!(r.severity(), Severity::Critical);
    }

    #[test]
    fn test_missing_parameters_never_trigger() {
        let r = classify_default(&PlantSnapshot::default());
        assert!(!r.anomaly_flag());

        let s = PlantSnapshot {
            kiln_temp: Some(f64::NAN),
            feed_rate: Some(f64::NEG_INFINITY),
            ..Default::default()
        };
        assert!(!classify_default(&s).anomaly_flag());
    }

    #[test]
    fn test_fan_critical_bounds_from_policy() {
        let mut policy = DEFAULT_POLICY;
        policy.fan_speed.critical_max = Some(95.0);
        policy.fan_speed.critical_min = Some(50.0);
        let mut s = nominal();

        s.fan_speed = Some(96.0);
        assert_eq!(classify(&s, &policy).anomalies(), &[AnomalyTag::CriticalHighFanSpeed]);
        s.fan_speed = Some(45.0);
        assert_eq!(classify(&s, &policy).anomalies(), &[AnomalyTag::CriticalLowFanSpeed]);
        s.fan_speed = Some(60.0);
        assert_eq!(classify(&s, &policy).anomalies(), &[AnomalyTag::LowFanSpeed]);
    }

    #[test]
    fn test_bounds_without_tag_are_ignored() {
        let mut policy = DEFAULT_POLICY;
        policy.energy_use.critical_min = Some(100.0);
        let mut s = nominal();
        s.energy_use = Some(10.0);
        assert!(!classify(&s, &policy).anomaly_flag());
    }

    #[test]
    fn test_classify_is_deterministic_over_grid() {
        let values = [0.0, 70.0, 81.9, 88.0, 110.5, 160.1, 1399.0, 1490.0, 1600.0];
        for &a in &values {
            for &b in &values {
                let s = snapshot(a, b, a, b, a, b, a);
                let first = classify_default(&s);
                assert_eq!(first, classify_default(&s));

                // Severity invariant
                let expected = if !first.critical_anomalies().is_empty() {
                    Severity::Critical
                } else if !first.warning_anomalies().is_empty() {
                    Severity::Warning
                } else {
                    Severity::Normal
                };
                assert_eq!(first.severity(), expected);
                assert_eq!(
                    first.anomalies().len(),
                    first.critical_anomalies().len() + first.warning_anomalies().len()
                );
                assert!(first.anomalies().len() <= Parameter::ALL.len());
            }
        }
    }

    #[test]
    fn test_format_anomaly_name() {
        assert_eq!(format_anomaly_name("high_kiln_temp"), "High Kiln Temp");
        assert_eq!(
            format_anomaly_name("elevated_energy_consumption"),
            "Elevated Energy Consumption"
        );
        assert_eq!(format_anomaly_name("low"), "Low");
        assert_eq!(format_anomaly_name(""), "");
    }
}
