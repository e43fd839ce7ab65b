//! Alert deduplication policies
//!
//! The default creates an alert every time an anomaly is observed, even when
//! the same anomaly persists across polls. [`WindowedDedup`] suppresses
//! repeats of the same severity and anomaly set within a time window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::AnomalyReport;

/// Decides whether an anomalous report should produce a new alert.
pub trait AlertDedupPolicy: Send + Sync {
    /// `true` to create the alert (and notify), `false` to suppress it.
    fn admit(&self, report: &AnomalyReport, now: DateTime<Utc>) -> bool;

    /// Undo an admission whose alert could not be stored.
    fn release(&self, _report: &AnomalyReport) {}
}

/// Every anomalous report becomes an alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDedup;

impl AlertDedupPolicy for NoDedup {
    fn admit(&self, _report: &AnomalyReport, _now: DateTime<Utc>) -> bool {
        true
    }
}

/// Suppress a report whose key was admitted less than `window` ago.
pub struct WindowedDedup {
    window: Duration,
    last_admitted: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl WindowedDedup {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or(Duration::MAX),
            last_admitted: Mutex::new(HashMap::new()),
        }
    }

    /// `severity` plus the sorted anomaly tags.
    pub fn key(report: &AnomalyReport) -> String {
        let mut tags: Vec<&str> = report.anomalies().iter().map(|t| t.as_str()).collect();
        tags.sort_unstable();
        format!("{}:{}", report.severity(), tags.join(","))
    }
}

impl AlertDedupPolicy for WindowedDedup {
    fn admit(&self, report: &AnomalyReport, now: DateTime<Utc>) -> bool {
        let key = Self::key(report);
        let Ok(mut seen) = self.last_admitted.lock() else {
            // Poisoned: fall back to alerting.
            return true;
        };
        // Keep the map bounded to keys still inside the window.
        seen.retain(|_, at| now - *at < self.window);

        match seen.get(&key) {
            Some(_) => false,
            None => {
                seen.insert(key, now);
                true
            }
        }
    }

    fn release(&self, report: &AnomalyReport) {
        if let Ok(mut seen) = self.last_admitted.lock() {
            seen.remove(&Self::key(report));
        }
    }
}
