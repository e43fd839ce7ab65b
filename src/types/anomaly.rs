//! Severity tiers, anomaly tags, and the classifier's report

use serde::{Deserialize, Serialize};

/// Ordered severity tier: `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Stable symbolic identifier for one detected anomaly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyTag {
    LowGrindingEfficiency,
    SuboptimalGrindingEfficiency,
    HighKilnTemp,
    ElevatedKilnTemp,
    LowKilnTemp,
    HighEnergyConsumption,
    ElevatedEnergyConsumption,
    HighEmissions,
    ElevatedEmissions,
    LowProductQuality,
    SuboptimalProductQuality,
    CriticalHighFanSpeed,
    CriticalLowFanSpeed,
    HighFanSpeed,
    LowFanSpeed,
    CriticalHighFeedRate,
    CriticalLowFeedRate,
    HighFeedRate,
    LowFeedRate,
}

impl AnomalyTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowGrindingEfficiency => "low_grinding_efficiency",
            Self::SuboptimalGrindingEfficiency => "suboptimal_grinding_efficiency",
            Self::HighKilnTemp => "high_kiln_temp",
            Self::ElevatedKilnTemp => "elevated_kiln_temp",
            Self::LowKilnTemp => "low_kiln_temp",
            Self::HighEnergyConsumption => "high_energy_consumption",
            Self::ElevatedEnergyConsumption => "elevated_energy_consumption",
            Self::HighEmissions => "high_emissions",
            Self::ElevatedEmissions => "elevated_emissions",
            Self::LowProductQuality => "low_product_quality",
            Self::SuboptimalProductQuality => "suboptimal_product_quality",
            Self::CriticalHighFanSpeed => "critical_high_fan_speed",
            Self::CriticalLowFanSpeed => "critical_low_fan_speed",
            Self::HighFanSpeed => "high_fan_speed",
            Self::LowFanSpeed => "low_fan_speed",
            Self::CriticalHighFeedRate => "critical_high_feed_rate",
            Self::CriticalLowFeedRate => "critical_low_feed_rate",
            Self::HighFeedRate => "high_feed_rate",
            Self::LowFeedRate => "low_feed_rate",
        }
    }
}

impl std::fmt::Display for AnomalyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity-graded classifier output.
///
/// Only constructible through [`AnomalyReport::from_tiers`], which derives
/// `anomalies`, `anomaly_flag` and `severity` from the two tiers. Deserializing
/// rebuilds the report the same way, so a stored report can never carry an
/// inconsistent severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReportTiers")]
pub struct AnomalyReport {
    anomaly_flag: bool,
    anomalies: Vec<AnomalyTag>,
    critical_anomalies: Vec<AnomalyTag>,
    warning_anomalies: Vec<AnomalyTag>,
    severity: Severity,
}

#[derive(Deserialize)]
struct ReportTiers {
    #[serde(default)]
    critical_anomalies: Vec<AnomalyTag>,
    #[serde(default)]
    warning_anomalies: Vec<AnomalyTag>,
}

impl From<ReportTiers> for AnomalyReport {
    fn from(t: ReportTiers) -> Self {
        Self::from_tiers(t.critical_anomalies, t.warning_anomalies)
    }
}

impl AnomalyReport {
    pub fn from_tiers(critical: Vec<AnomalyTag>, warning: Vec<AnomalyTag>) -> Self {
        let severity = if !critical.is_empty() {
            Severity::Critical
        } else if !warning.is_empty() {
            Severity::Warning
        } else {
            Severity::Normal
        };
        let anomalies: Vec<AnomalyTag> = critical.iter().chain(warning.iter()).copied().collect();
        Self {
            anomaly_flag: !anomalies.is_empty(),
            anomalies,
            critical_anomalies: critical,
            warning_anomalies: warning,
            severity,
        }
    }

    pub fn normal() -> Self {
        Self::from_tiers(Vec::new(), Vec::new())
    }

    pub const fn anomaly_flag(&self) -> bool {
        self.anomaly_flag
    }

    /// Critical tags first, then warnings.
    pub fn anomalies(&self) -> &[AnomalyTag] {
        &self.anomalies
    }

    pub fn critical_anomalies(&self) -> &[AnomalyTag] {
        &self.critical_anomalies
    }

    pub fn warning_anomalies(&self) -> &[AnomalyTag] {
        &self.warning_anomalies
    }

    pub const fn severity(&self) -> Severity {
        self.severity
    }
}
