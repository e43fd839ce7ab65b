//! Plant Configuration
//!
//! Every operator-tunable value: anomaly bounds (global and per plant),
//! baselines, collaborator endpoints, notification fan-out, scheduling and
//! access rules. All sections default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::anomaly::StaticThresholds;
use crate::notify::{SmtpSettings, UserEntry};
use crate::pipeline::{OrchestratorSettings, RoleCapabilities, ScheduleMode};
use crate::types::{Parameter, ParameterBounds, ThresholdOverrides, ThresholdPolicy};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CEMENT_OPS_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "plant_config.toml";

/// Top-level plant configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    pub plant: PlantInfo,
    /// Global overrides on top of the built-in anomaly bounds.
    pub thresholds: ThresholdOverrides,
    /// Per-plant overrides on top of the global ones, keyed by plant id.
    pub plant_overrides: HashMap<String, ThresholdOverrides>,
    pub baselines: Baselines,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub telemetry: TelemetryConfig,
    pub recommender: RecommenderConfig,
    pub predictor: PredictorConfig,
    pub notifications: NotificationsConfig,
    pub scheduler: SchedulerConfig,
    pub alerts: AlertsConfig,
    pub access: RoleCapabilities,
}

impl PlantConfig {
    /// Load configuration using the standard search order:
    /// 1. `$CEMENT_OPS_CONFIG`
    /// 2. `./plant_config.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), plant = %config.plant.name, "Loaded plant config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(plant = %config.plant.name, "Loaded plant config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Plant config saved");
        Ok(())
    }

    /// Check every resolved threshold policy plus the runtime limits.
    ///
    /// Bounds are checked after overrides are applied, so an override that
    /// moves one bound past its neighbour is caught.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let thresholds = self.threshold_provider();
        Self::check_policy("thresholds", thresholds.global(), &mut errors);
        let mut plants: Vec<&String> = self.plant_overrides.keys().collect();
        plants.sort();
        for plant in plants {
            let policy = thresholds.global().with_overrides(&self.plant_overrides[plant]);
            Self::check_policy(&format!("plant_overrides.{plant}"), &policy, &mut errors);
        }

        for (name, value) in [
            ("baselines.baseline_energy", self.baselines.baseline_energy),
            ("baselines.baseline_emissions", self.baselines.baseline_emissions),
            ("baselines.baseline_efficiency", self.baselines.baseline_efficiency),
        ] {
            if !value.is_finite() {
                errors.push(format!("{name}: must be finite (got {value})"));
            }
        }

        if self.scheduler.max_concurrent_cycles == 0 {
            errors.push("scheduler.max_concurrent_cycles: must be > 0".to_string());
        }
        if self.scheduler.interval_secs == 0 {
            errors.push("scheduler.interval_secs: must be > 0".to_string());
        }
        if self.recommender.timeout_secs == 0 {
            errors.push("recommender.timeout_secs: must be > 0".to_string());
        }
        if self.predictor.timeout_secs == 0 {
            errors.push("predictor.timeout_secs: must be > 0".to_string());
        }
        if self.alerts.dedup_window_secs == Some(0) {
            errors.push("alerts.dedup_window_secs: must be > 0 when set".to_string());
        }
        if self.telemetry.required_fields.iter().any(|f| f.trim().is_empty()) {
            errors.push("telemetry.required_fields: entries must be non-empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_policy(prefix: &str, policy: &ThresholdPolicy, errors: &mut Vec<String>) {
        for param in Parameter::ALL {
            let name = format!("{prefix}.{}", param.key());
            Self::check_bounds(policy.bounds(param), &name, errors);
        }
    }

    fn check_bounds(b: &ParameterBounds, name: &str, errors: &mut Vec<String>) {
        let present = [b.critical_min, b.warning_min, b.warning_max, b.critical_max];
        if present.iter().flatten().any(|v| !v.is_finite()) {
            errors.push(format!("{name}: bounds must be finite"));
            return;
        }
        if let (Some(w), Some(c)) = (b.warning_max, b.critical_max) {
            if c < w {
                errors.push(format!("{name}: critical_max ({c:.3}) must be >= warning_max ({w:.3})"));
            }
        }
        if let (Some(w), Some(c)) = (b.warning_min, b.critical_min) {
            if c > w {
                errors.push(format!("{name}: critical_min ({c:.3}) must be <= warning_min ({w:.3})"));
            }
        }
        if let (Some(lo), Some(hi)) = (b.warning_min, b.warning_max) {
            if lo >= hi {
                errors.push(format!("{name}: warning_min ({lo:.3}) must be < warning_max ({hi:.3})"));
            }
        }
    }

    // ========================================================================
    // Derived settings
    // ========================================================================

    pub fn threshold_provider(&self) -> StaticThresholds {
        StaticThresholds::new(&self.thresholds, &self.plant_overrides)
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            required_fields: self.telemetry.required_fields.clone(),
            max_concurrent_cycles: self.scheduler.max_concurrent_cycles,
        }
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        let n = &self.notifications;
        SmtpSettings {
            host: n.smtp_host.clone(),
            port: n.smtp_port,
            tls: n.smtp_tls,
            from: n.from_address.clone(),
        }
    }

    /// Admin fallback recipients: the configured list, else `$ADMIN_EMAILS`.
    pub fn admin_fallback(&self) -> Vec<String> {
        with_env_fallback(&self.notifications.admin_fallback, "ADMIN_EMAILS")
    }

    /// Operator fallback recipients: the configured list, else `$OPERATOR_EMAILS`.
    pub fn operator_fallback(&self) -> Vec<String> {
        with_env_fallback(&self.notifications.operator_fallback, "OPERATOR_EMAILS")
    }
}

fn with_env_fallback(configured: &[String], var: &str) -> Vec<String> {
    if !configured.is_empty() {
        return configured.to_vec();
    }
    std::env::var(var)
        .map(|raw| split_addresses(&raw))
        .unwrap_or_default()
}

/// Split a comma-separated address list, dropping blanks.
pub fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "Config parse error ({}): {}", path.display(), e),
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantInfo {
    pub id: Option<String>,
    pub name: String,
}

impl Default for PlantInfo {
    fn default() -> Self {
        Self {
            id: None,
            name: "Unnamed Plant".to_string(),
        }
    }
}

/// Reference values reported alongside live readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Baselines {
    /// kWh/ton
    pub baseline_energy: f64,
    /// kg CO2/ton
    pub baseline_emissions: f64,
    /// %
    pub baseline_efficiency: f64,
}

impl Default for Baselines {
    fn default() -> Self {
        Self {
            baseline_energy: 175.0,
            baseline_emissions: 130.0,
            baseline_efficiency: 85.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// sled database directory.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/cement-ops"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// JSON-lines file; the last line is the latest snapshot.
    pub jsonl_path: PathBuf,
    /// Fields a snapshot must carry (finite) before a cycle runs.
    pub required_fields: Vec<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            jsonl_path: PathBuf::from("./data/plant_state.jsonl"),
            required_fields: OrchestratorSettings::default().required_fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl RecommenderConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Prediction endpoint; `None` disables verification and model-based simulation.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl PredictorConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_tls: bool,
    pub from_address: String,
    /// Dashboard link included in alert e-mails.
    pub frontend_url: Option<String>,
    pub users: Vec<UserEntry>,
    pub admin_fallback: Vec<String>,
    pub operator_fallback: Vec<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            smtp_tls: true,
            from_address: "cement-ops@localhost".to_string(),
            frontend_url: None,
            users: Vec::new(),
            admin_fallback: Vec::new(),
            operator_fallback: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub mode: ScheduleMode,
    pub max_concurrent_cycles: usize,
}

impl SchedulerConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 600,
            mode: ScheduleMode::AnomalyCheck,
            max_concurrent_cycles: 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Suppress repeats of the same anomaly set within this window. Unset keeps every alert.
    pub dedup_window_secs: Option<u64>,
}
