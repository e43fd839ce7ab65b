//! Config validation: unknown-key detection with Levenshtein suggestions.
//!
//! The raw TOML is parsed into `toml::Value` first and every dotted key path
//! is compared against the known field names. Unknown keys produce warnings
//! with a "did you mean?" suggestion; they never fail the load.

use std::collections::HashSet;

use crate::types::Parameter;

/// A non-fatal config warning.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

const BOUND_KEYS: [&str; 4] = ["critical_min", "warning_min", "warning_max", "critical_max"];

const FIXED_KEYS: &[&str] = &[
    "plant",
    "plant.id",
    "plant.name",
    "thresholds",
    "plant_overrides",
    "plant_overrides.*",
    "baselines",
    "baselines.baseline_energy",
    "baselines.baseline_emissions",
    "baselines.baseline_efficiency",
    "server",
    "server.addr",
    "storage",
    "storage.data_dir",
    "telemetry",
    "telemetry.jsonl_path",
    "telemetry.required_fields",
    "recommender",
    "recommender.base_url",
    "recommender.model",
    "recommender.timeout_secs",
    "predictor",
    "predictor.endpoint",
    "predictor.timeout_secs",
    "notifications",
    "notifications.smtp_host",
    "notifications.smtp_port",
    "notifications.smtp_tls",
    "notifications.from_address",
    "notifications.frontend_url",
    "notifications.users",
    "notifications.admin_fallback",
    "notifications.operator_fallback",
    "scheduler",
    "scheduler.enabled",
    "scheduler.interval_secs",
    "scheduler.mode",
    "scheduler.max_concurrent_cycles",
    "alerts",
    "alerts.dedup_window_secs",
    "access",
    "access.run_cycle",
    "access.acknowledge_alert",
];

/// Every valid dotted key path. Plant ids under `plant_overrides` appear as `*`.
pub fn known_config_keys() -> HashSet<String> {
    let mut keys: HashSet<String> = FIXED_KEYS.iter().map(|k| (*k).to_string()).collect();
    for prefix in ["thresholds", "plant_overrides.*"] {
        for param in Parameter::ALL {
            let section = format!("{prefix}.{}", param.key());
            for bound in BOUND_KEYS {
                keys.insert(format!("{section}.{bound}"));
            }
            keys.insert(section);
        }
    }
    keys
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
/// Arrays of tables are not descended into.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

/// Replace the plant id segment of a `plant_overrides` path with `*`.
fn normalize_key(key: &str) -> String {
    let mut parts: Vec<&str> = key.split('.').collect();
    if parts.len() >= 2 && parts[0] == "plant_overrides" {
        parts[1] = "*";
    }
    parts.join(".")
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)))
        .map(|(k, _)| k.clone())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        // serde reports the parse error later
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter_map(|key| {
            let normalized = normalize_key(&key);
            if known.contains(&normalized) {
                return None;
            }
            let suggestion = suggest_correction(&normalized, &known);
            Some(ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typo_gets_suggestion() {
        let warnings = validate_unknown_keys(
            r#"
            [scheduler]
            intervl_secs = 300
            "#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "scheduler.intervl_secs");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("scheduler.interval_secs"));
    }

    #[test]
    fn test_plant_override_ids_are_wildcards() {
        let warnings = validate_unknown_keys(
            r#"
            [plant_overrides.kiln-7.fan_speed]
            warning_min = 60.0
            "#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_threshold_param_typo() {
        let warnings = validate_unknown_keys(
            r#"
            [thresholds.kiln_tmp]
            critical_max = 1510.0
            "#,
        );
        assert!(warnings
            .iter()
            .any(|w| w.suggestion.as_deref() == Some("thresholds.kiln_temp")));
    }

    #[test]
    fn test_user_list_entries_not_walked() {
        let warnings = validate_unknown_keys(
            r#"
            [[notifications.users]]
            email = "ops@plant.example"
            role = "operator"
            "#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }
}
