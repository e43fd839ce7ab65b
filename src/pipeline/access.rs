//! Capability checks run before any cycle stage executes

use serde::{Deserialize, Serialize};

use super::CycleError;
use crate::types::{Actor, Capability, Role};

/// Decides whether an already-authenticated actor may perform an operation.
pub trait CapabilityCheck: Send + Sync {
    fn check(&self, actor: &Actor, capability: Capability) -> Result<(), CycleError>;
}

/// Role lists per capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleCapabilities {
    pub run_cycle: Vec<Role>,
    pub acknowledge_alert: Vec<Role>,
}

impl Default for RoleCapabilities {
    fn default() -> Self {
        Self {
            run_cycle: vec![Role::Admin],
            acknowledge_alert: vec![Role::Admin, Role::Operator],
        }
    }
}

impl CapabilityCheck for RoleCapabilities {
    fn check(&self, actor: &Actor, capability: Capability) -> Result<(), CycleError> {
        let allowed = match capability {
            Capability::RunCycle => &self.run_cycle,
            Capability::AcknowledgeAlert => &self.acknowledge_alert,
        };
        if allowed.contains(&actor.role) {
            Ok(())
        } else {
            tracing::warn!(
                actor = %actor.email,
                role = %actor.role,
                capability = %capability,
                "Capability denied"
            );
            Err(CycleError::Forbidden {
                actor: actor.email.clone(),
                capability,
            })
        }
    }
}
