//! Alert persistence
//!
//! Alerts live in the `alerts` sled tree keyed by creation time (big-endian
//! nanoseconds followed by the alert id), so reverse iteration yields the
//! newest first. A second tree, `alert_index`, maps alert id to that key.

use chrono::{DateTime, Utc};
use sled::Tree;
use std::sync::RwLock;

use super::{time_key, StorageError};
use crate::types::{AckOutcome, Alert, Severity};

/// Durable store for alert records.
///
/// Acknowledgment is the only mutation an alert supports after creation.
pub trait AlertStore: Send + Sync {
    /// Persist a new alert and return its id.
    fn create(&self, alert: &Alert) -> Result<String, StorageError>;

    fn get(&self, id: &str) -> Result<Option<Alert>, StorageError>;

    /// Up to `limit` alerts, newest first, optionally restricted to one severity.
    fn list(&self, limit: usize, severity: Option<Severity>) -> Result<Vec<Alert>, StorageError>;

    /// Mark an alert acknowledged. A second acknowledgment leaves the stored
    /// record untouched and reports [`AckOutcome::AlreadyAcknowledged`].
    fn acknowledge(
        &self,
        id: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<AckOutcome, StorageError>;

    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// Sled backend
// ============================================================================

#[derive(Clone)]
pub struct SledAlertStore {
    alerts: Tree,
    index: Tree,
}

impl SledAlertStore {
    pub fn open(db: &sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            alerts: db.open_tree("alerts")?,
            index: db.open_tree("alert_index")?,
        })
    }

    fn key_for(&self, id: &str) -> Result<Option<sled::IVec>, StorageError> {
        Ok(self.index.get(id.as_bytes())?)
    }
}

impl AlertStore for SledAlertStore {
    fn create(&self, alert: &Alert) -> Result<String, StorageError> {
        let key = time_key(alert.timestamp, &alert.id);
        let bytes = serde_json::to_vec(alert)?;
        self.alerts.insert(key.as_slice(), bytes)?;
        self.index.insert(alert.id.as_bytes(), key.as_slice())?;
        Ok(alert.id.clone())
    }

    fn get(&self, id: &str) -> Result<Option<Alert>, StorageError> {
        let Some(key) = self.key_for(id)? else {
            return Ok(None);
        };
        match self.alerts.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list(&self, limit: usize, severity: Option<Severity>) -> Result<Vec<Alert>, StorageError> {
        let mut out = Vec::with_capacity(limit.min(256));
        for item in self.alerts.iter().rev() {
            if out.len() >= limit {
                break;
            }
            let (_, bytes) = item?;
            match serde_json::from_slice::<Alert>(&bytes) {
                Ok(alert) if severity.map_or(true, |s| alert.severity == s) => out.push(alert),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping undecodable alert record"),
            }
        }
        Ok(out)
    }

    fn acknowledge(
        &self,
        id: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<AckOutcome, StorageError> {
        let Some(key) = self.key_for(id)? else {
            return Ok(AckOutcome::NotFound);
        };

        // Compare-and-swap so concurrent acknowledgments cannot both win.
        loop {
            let Some(current) = self.alerts.get(&key)? else {
                return Ok(AckOutcome::NotFound);
            };
            let mut alert: Alert = serde_json::from_slice(&current)?;
            if !alert.acknowledge(actor, at) {
                return Ok(AckOutcome::AlreadyAcknowledged(alert));
            }
            let updated = serde_json::to_vec(&alert)?;
            match self
                .alerts
                .compare_and_swap(&key, Some(&current), Some(updated))?
            {
                Ok(()) => return Ok(AckOutcome::Acknowledged(alert)),
                Err(_) => continue,
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Alert store for tests and ephemeral runs. Not durable.
#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: RwLock<Vec<Alert>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertStore for InMemoryAlertStore {
    fn create(&self, alert: &Alert) -> Result<String, StorageError> {
        self.alerts
            .write()
            .map_err(|e| StorageError::Database(e.to_string()))?
            .push(alert.clone());
        Ok(alert.id.clone())
    }

    fn get(&self, id: &str) -> Result<Option<Alert>, StorageError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(alerts.iter().find(|a| a.id == id).cloned())
    }

    fn list(&self, limit: usize, severity: Option<Severity>) -> Result<Vec<Alert>, StorageError> {
        let alerts = self
            .alerts
            .read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let mut matching: Vec<Alert> = alerts
            .iter()
            .filter(|a| severity.map_or(true, |s| a.severity == s))
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal timestamps; reverse it too.
        matching.reverse();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(limit);
        Ok(matching)
    }

    fn acknowledge(
        &self,
        id: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<AckOutcome, StorageError> {
        let mut alerts = self
            .alerts
            .write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let Some(alert) = alerts.iter_mut().find(|a| a.id == id) else {
            return Ok(AckOutcome::NotFound);
        };
        if alert.acknowledge(actor, at) {
            Ok(AckOutcome::Acknowledged(alert.clone()))
        } else {
            Ok(AckOutcome::AlreadyAcknowledged(alert.clone()))
        }
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
