//! Recipient lookup by role

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::NotifyError;
use crate::types::Role;

/// A user known to the notification system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub email: String,
    pub role: Role,
    #[serde(default = "default_true")]
    pub email_notifications: bool,
}

fn default_true() -> bool {
    true
}

/// Source of notification recipients.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Addresses of users with `role` who opted in to e-mail notifications.
    async fn recipients_for(&self, role: Role) -> Result<Vec<String>, NotifyError>;
}

/// Directory backed by the configured user list.
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    users: Vec<UserEntry>,
}

impl StaticUserDirectory {
    pub fn new(users: Vec<UserEntry>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn recipients_for(&self, role: Role) -> Result<Vec<String>, NotifyError> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.role == role && u.email_notifications && !u.email.trim().is_empty())
            .map(|u| u.email.trim().to_string())
            .collect())
    }
}
