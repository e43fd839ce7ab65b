//! Threshold resolution per plant

use std::collections::HashMap;

use crate::types::{ThresholdOverrides, ThresholdPolicy, DEFAULT_POLICY};

/// Supplies the threshold policy to classify a snapshot with.
pub trait ThresholdProvider: Send + Sync {
    /// Effective policy for a plant. `None` means the snapshot carried no plant id.
    fn policy_for(&self, plant_id: Option<&str>) -> ThresholdPolicy;
}

/// Policy resolved from configuration: defaults, then global overrides, then
/// per-plant overrides.
#[derive(Debug, Clone)]
pub struct StaticThresholds {
    global: ThresholdPolicy,
    per_plant: HashMap<String, ThresholdPolicy>,
}

impl StaticThresholds {
    pub fn new(global: &ThresholdOverrides, plants: &HashMap<String, ThresholdOverrides>) -> Self {
        let global = DEFAULT_POLICY.with_overrides(global);
        let per_plant = plants
            .iter()
            .map(|(id, ov)| (id.clone(), global.with_overrides(ov)))
            .collect();
        Self { global, per_plant }
    }

    pub fn global(&self) -> &ThresholdPolicy {
        &self.global
    }
}

impl Default for StaticThresholds {
    fn default() -> Self {
        Self {
            global: DEFAULT_POLICY,
            per_plant: HashMap::new(),
        }
    }
}

impl ThresholdProvider for StaticThresholds {
    fn policy_for(&self, plant_id: Option<&str>) -> ThresholdPolicy {
        plant_id
            .and_then(|id| self.per_plant.get(id))
            .unwrap_or(&self.global)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_override_layers_on_global() {
        let mut global = ThresholdOverrides::default();
        global.energy_use.warning_max = Some(158.0);

        let mut kiln2 = ThresholdOverrides::default();
        kiln2.kiln_temp.critical_max = Some(1520.0);

        let plants = HashMap::from([("kiln-2".to_string(), kiln2)]);
        let provider = StaticThresholds::new(&global, &plants);

        let p = provider.policy_for(Some("kiln-2"));
        assert_eq!(p.kiln_temp.critical_max, Some(1520.0));
        assert_eq!(p.energy_use.warning_max, Some(158.0));
        assert_eq!(p.energy_use.critical_max, Some(170.0));

        let other = provider.policy_for(Some("kiln-9"));
        assert_eq!(other.kiln_temp.critical_max, Some(1500.0));
        assert_eq!(other, *provider.global());
        assert_eq!(provider.policy_for(None), *provider.global());
    }
}
