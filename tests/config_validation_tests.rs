//! Config Validation Tests
//!
//! Exercise typo detection and threshold consistency checks independently
//! from the rest of the service.

use cement_ops::anomaly::ThresholdProvider;
use cement_ops::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use cement_ops::config::{ConfigError, PlantConfig};
use cement_ops::pipeline::ScheduleMode;
use cement_ops::types::Role;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn test_typo_in_baselines_warns_with_suggestion() {
    let toml_str = r#"
[baselines]
baseline_enrgy = 170.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("baseline_enrgy"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("baselines.baseline_energy")
    );
}

#[test]
fn test_unknown_section_without_close_match_has_no_suggestion() {
    let warnings = validate_unknown_keys("[historian]\nhub_url = \"http://x\"\n");
    assert!(!warnings.is_empty());
    assert!(warnings.iter().all(|w| w.suggestion.is_none()));
}

#[test]
fn test_valid_full_config_has_no_warnings() {
    let toml_str = r#"
[plant]
id = "kiln-1"
name = "Line 1"

[thresholds.kiln_temp]
critical_max = 1510.0

[plant_overrides.kiln-2.feed_rate]
warning_max = 125.0

[baselines]
baseline_energy = 170.0

[server]
addr = "127.0.0.1:9000"

[storage]
data_dir = "/var/lib/cement-ops"

[telemetry]
jsonl_path = "/var/lib/cement-ops/state.jsonl"
required_fields = ["kiln_temp", "energy_use"]

[recommender]
model = "gemini-1.5-pro"
timeout_secs = 60

[predictor]
endpoint = "http://predictor.internal/predict"

[notifications]
smtp_host = "smtp.plant.example"
smtp_port = 465
from_address = "alerts@plant.example"
frontend_url = "https://ops.plant.example"
admin_fallback = ["oncall@plant.example"]

[[notifications.users]]
email = "ops@plant.example"
role = "operator"

[scheduler]
interval_secs = 300
mode = "full_cycle"

[alerts]
dedup_window_secs = 900

[access]
run_cycle = ["admin", "operator"]
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let config = PlantConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.plant.id.as_deref(), Some("kiln-1"));
    assert_eq!(config.scheduler.mode, ScheduleMode::FullCycle);
    assert_eq!(config.alerts.dedup_window_secs, Some(900));
    assert_eq!(config.access.run_cycle, vec![Role::Admin, Role::Operator]);
    assert_eq!(config.notifications.users.len(), 1);
    assert!(config.notifications.users[0].email_notifications);
    assert_eq!(config.admin_fallback(), vec!["oncall@plant.example".to_string()]);

    let thresholds = config.threshold_provider();
    assert_eq!(thresholds.policy_for(None).kiln_temp.critical_max, Some(1510.0));
    assert_eq!(thresholds.policy_for(Some("kiln-2")).feed_rate.warning_max, Some(125.0));
    assert_eq!(thresholds.policy_for(Some("kiln-2")).kiln_temp.critical_max, Some(1510.0));
}

#[test]
fn test_every_parameter_has_known_bound_keys() {
    let known = known_config_keys();
    for key in [
        "thresholds.emissions_CO2.critical_max",
        "thresholds.product_quality_index.warning_min",
        "plant_overrides.*.fan_speed.critical_min",
    ] {
        assert!(known.contains(key), "missing {key}");
    }
}

#[test]
fn test_suggestion_prefers_closest_key() {
    let known = known_config_keys();
    assert_eq!(
        suggest_correction("server.adr", &known).as_deref(),
        Some("server.addr")
    );
    assert!(suggest_correction("completely.unrelated.path", &known).is_none());
}

// ============================================================================
// Consistency Checks
// ============================================================================

fn validation_errors(toml_str: &str) -> Vec<String> {
    match PlantConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(errors)) => errors,
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn test_warning_above_critical_rejected() {
    let errors = validation_errors(
        r#"
[thresholds.energy_use]
warning_max = 175.0
"#,
    );
    assert!(errors.iter().any(|e| e.contains("thresholds.energy_use")), "{errors:?}");
}

#[test]
fn test_low_side_inversion_rejected() {
    let errors = validation_errors(
        r#"
[thresholds.grinding_efficiency]
critical_min = 90.0
"#,
    );
    assert!(errors.iter().any(|e| e.contains("critical_min")), "{errors:?}");
}

#[test]
fn test_collapsed_band_rejected() {
    let errors = validation_errors(
        r#"
[thresholds.fan_speed]
warning_min = 85.0
"#,
    );
    assert!(errors.iter().any(|e| e.contains("warning_min")), "{errors:?}");
}

#[test]
fn test_plant_override_inversion_names_the_plant() {
    let errors = validation_errors(
        r#"
[plant_overrides.kiln-9.kiln_temp]
critical_max = 1450.0
"#,
    );
    assert!(errors.iter().any(|e| e.contains("plant_overrides.kiln-9.kiln_temp")), "{errors:?}");
}

#[test]
fn test_zero_limits_rejected() {
    let errors = validation_errors(
        r#"
[scheduler]
interval_secs = 0
max_concurrent_cycles = 0

[alerts]
dedup_window_secs = 0
"#,
    );
    assert_eq!(errors.len(), 3, "{errors:?}");
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let err = tokio_test::assert_err!(PlantConfig::from_toml_str("[scheduler\ninterval_secs = 1"));
    assert!(matches!(err, ConfigError::Parse(..)), "{err:?}");
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PlantConfig::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)), "{err:?}");
}
