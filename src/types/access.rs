//! Actor identity as resolved by the external auth collaborator

use serde::{Deserialize, Serialize};

/// User role. Notification fan-out and capability checks key on this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "operator" => Ok(Self::Operator),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A verified caller. The core never authenticates; it only checks the role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }
}

/// Operations subject to role gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RunCycle,
    AcknowledgeAlert,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunCycle => f.write_str("run_cycle"),
            Self::AcknowledgeAlert => f.write_str("acknowledge_alert"),
        }
    }
}

/// What started a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Actor { email: String, role: Role },
    Scheduler,
}

impl Trigger {
    pub fn label(&self) -> &str {
        match self {
            Self::Actor { email, .. } => email,
            Self::Scheduler => "scheduler",
        }
    }
}

impl From<&Actor> for Trigger {
    fn from(actor: &Actor) -> Self {
        Self::Actor {
            email: actor.email.clone(),
            role: actor.role,
        }
    }
}
