//! Durable cycle log
//!
//! One document per completed cycle, in the `cycles` sled tree, keyed like
//! alerts so the newest record comes back first.

use sled::Tree;
use std::sync::RwLock;

use super::{time_key, StorageError};
use crate::types::CycleRecord;

pub trait CycleLog: Send + Sync {
    fn record(&self, record: &CycleRecord) -> Result<(), StorageError>;

    /// Up to `limit` records, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<CycleRecord>, StorageError>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct SledCycleLog {
    tree: Tree,
}

impl SledCycleLog {
    pub fn open(db: &sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree("cycles")?,
        })
    }
}

impl CycleLog for SledCycleLog {
    fn record(&self, record: &CycleRecord) -> Result<(), StorageError> {
        let key = time_key(record.timestamp, &record.cycle_id);
        self.tree.insert(key, serde_json::to_vec(record)?)?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<CycleRecord>, StorageError> {
        let mut out = Vec::new();
        for item in self.tree.iter().rev().take(limit) {
            let (_, bytes) = item?;
            match serde_json::from_slice(&bytes) {
                Ok(rec) => out.push(rec),
                Err(e) => tracing::warn!(error = %e, "Skipping undecodable cycle record"),
            }
        }
        Ok(out)
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}

/// Cycle log for tests and ephemeral runs. Keeps at most `capacity` records.
pub struct InMemoryCycleLog {
    records: RwLock<Vec<CycleRecord>>,
    capacity: usize,
}

impl InMemoryCycleLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            capacity,
        }
    }
}

impl Default for InMemoryCycleLog {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl CycleLog for InMemoryCycleLog {
    fn record(&self, record: &CycleRecord) -> Result<(), StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        records.push(record.clone());
        if records.len() > self.capacity {
            records.remove(0);
        }
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<CycleRecord>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnomalyReport, PlantSnapshot, RecommendationPayload};
    use chrono::{DateTime, Duration, Utc};

    fn record(n: i64) -> CycleRecord {
        let base = "2025-03-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        CycleRecord {
            cycle_id: format!("cycle-{n}"),
            timestamp: base + Duration::minutes(n),
            triggered_by: "scheduler".to_string(),
            state: PlantSnapshot::default(),
            anomaly: AnomalyReport::normal(),
            recommendation: RecommendationPayload::default(),
        }
    }

    #[test]
    fn test_sled_recent_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let log = SledCycleLog::open(&db).unwrap();
        for n in [1, 3, 2] {
            log.record(&record(n)).unwrap();
        }
        let ids: Vec<_> = log.recent(2).unwrap().into_iter().map(|r| r.cycle_id).collect();
        assert_eq!(ids, vec!["cycle-3", "cycle-2"]);
    }

    #[test]
    fn test_in_memory_capacity() {
        let log = InMemoryCycleLog::new(2);
        for n in 0..5 {
            log.record(&record(n)).unwrap();
        }
        let recent = log.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].cycle_id, "cycle-4");
    }
}
