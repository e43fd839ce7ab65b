//! Durable Storage
//!
//! Sled-backed stores for alerts and the cycle log, plus in-memory variants
//! used by tests and ephemeral runs. Both stores share one `sled::Db` and
//! keep their records in named trees.

mod alerts;
mod cycles;

pub use alerts::{AlertStore, InMemoryAlertStore, SledAlertStore};
pub use cycles::{CycleLog, InMemoryCycleLog, SledCycleLog};

use chrono::{DateTime, Utc};
use std::path::Path;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Open (or create) the database under `dir`.
pub fn open_db(dir: impl AsRef<Path>) -> Result<sled::Db, StorageError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .map_err(|e| StorageError::Database(format!("{}: {e}", dir.display())))?;
    Ok(sled::open(dir)?)
}

/// Record key: big-endian creation nanos, then the record id as a tiebreak.
pub(crate) fn time_key(ts: DateTime<Utc>, id: &str) -> Vec<u8> {
    let nanos = ts.timestamp_nanos_opt().unwrap_or(i64::MAX).max(0) as u64;
    let mut key = Vec::with_capacity(8 + id.len());
    key.extend_from_slice(&nanos.to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}
