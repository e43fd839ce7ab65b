//! Telemetry source abstraction
//!
//! The telemetry warehouse is an opaque read source: it hands back flat
//! snapshots, newest first. Two implementations ship with the crate:
//!
//! - [`JsonlTelemetrySource`]: an append-only JSON-lines file, one snapshot per line
//! - [`InMemoryTelemetry`]: a vector behind a lock, for tests and demos

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::types::PlantSnapshot;

/// Telemetry errors
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed telemetry row: {0}")]
    Malformed(String),
}

/// Filters for history queries. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryFilter {
    pub plant_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn matches(&self, snap: &PlantSnapshot) -> bool {
        if let Some(id) = &self.plant_id {
            if snap.plant_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        match (snap.timestamp, self.since, self.until) {
            (Some(ts), Some(since), _) if ts < since => false,
            (Some(ts), _, Some(until)) if ts > until => false,
            (None, Some(_), _) | (None, _, Some(_)) => false,
            _ => true,
        }
    }
}

/// Read access to plant telemetry.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Most recent snapshot, or `None` when the source holds no rows.
    async fn fetch_latest(&self) -> Result<Option<PlantSnapshot>, TelemetryError>;

    /// Up to `limit` snapshots matching `filter`, newest first.
    async fn fetch_history(
        &self,
        limit: usize,
        filter: &HistoryFilter,
    ) -> Result<Vec<PlantSnapshot>, TelemetryError>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// JSON-lines file source
// ============================================================================

/// Reads snapshots from a JSON-lines file. The last line is the latest row.
pub struct JsonlTelemetrySource {
    path: PathBuf,
}

impl JsonlTelemetrySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn unavailable(&self, e: &std::io::Error) -> TelemetryError {
        TelemetryError::Unavailable(format!("{}: {}", self.path.display(), e))
    }

    /// Up to `max_lines` non-empty lines from the end of the file, newest
    /// first, reading backwards in fixed-size blocks. The flag is `true` when
    /// the whole file was read.
    async fn read_tail_lines(&self, max_lines: usize) -> Result<(Vec<String>, bool), TelemetryError> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), true)),
            Err(e) => return Err(self.unavailable(&e)),
        };
        let len = file.metadata().await.map_err(|e| self.unavailable(&e))?.len();

        let mut pos = len;
        let mut buf: Vec<u8> = Vec::new();
        loop {
            let lines = tail_lines(&buf, pos > 0);
            if pos == 0 || lines.len() >= max_lines {
                let lines = lines.into_iter().take(max_lines).collect();
                return Ok((lines, pos == 0));
            }
            let step = TAIL_BLOCK.min(pos);
            pos -= step;
            file.seek(SeekFrom::Start(pos))
                .await
                .map_err(|e| self.unavailable(&e))?;
            let mut block = vec![0u8; usize::try_from(step).unwrap_or(usize::MAX)];
            file.read_exact(&mut block)
                .await
                .map_err(|e| self.unavailable(&e))?;
            block.extend_from_slice(&buf);
            buf = block;
        }
    }
}

const TAIL_BLOCK: u64 = 8 * 1024;

/// Non-empty lines of `buf`, last first. With `partial_head` the text before
/// the first newline may be cut off and is dropped.
fn tail_lines(buf: &[u8], partial_head: bool) -> Vec<String> {
    let text = String::from_utf8_lossy(buf);
    text.split('\n')
        .skip(usize::from(partial_head))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl TelemetrySource for JsonlTelemetrySource {
    async fn fetch_latest(&self) -> Result<Option<PlantSnapshot>, TelemetryError> {
        let (lines, _) = self.read_tail_lines(1).await?;
        let Some(last) = lines.first() else {
            return Ok(None);
        };
        serde_json::from_str(last)
            .map(Some)
            .map_err(|e| TelemetryError::Malformed(e.to_string()))
    }

    async fn fetch_history(
        &self,
        limit: usize,
        filter: &HistoryFilter,
    ) -> Result<Vec<PlantSnapshot>, TelemetryError> {
        // Widen the tail until enough rows match or the file is exhausted.
        let mut window = limit.max(1);
        loop {
            let (lines, whole_file) = self.read_tail_lines(window).await?;
            let rows: Vec<PlantSnapshot> = lines
                .iter()
                .filter_map(|line| match serde_json::from_str::<PlantSnapshot>(line) {
                    Ok(snap) => Some(snap),
                    Err(e) => {
                        tracing::warn!(source = "jsonl", error = %e, "Skipping malformed telemetry row");
                        None
                    }
                })
                .filter(|s| filter.matches(s))
                .take(limit)
                .collect();
            if rows.len() >= limit || whole_file {
                return Ok(rows);
            }
            window = window.saturating_mul(4);
        }
    }

    fn source_name(&self) -> &str {
        "jsonl"
    }
}

// ============================================================================
// In-memory source
// ============================================================================

/// Snapshots held in memory, oldest first.
#[derive(Default)]
pub struct InMemoryTelemetry {
    rows: RwLock<Vec<PlantSnapshot>>,
}

impl InMemoryTelemetry {
    pub fn new(rows: Vec<PlantSnapshot>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub fn push(&self, snapshot: PlantSnapshot) -> Result<(), TelemetryError> {
        self.rows
            .write()
            .map_err(|e| TelemetryError::Unavailable(format!("lock poisoned: {e}")))?
            .push(snapshot);
        Ok(())
    }
}

#[async_trait]
impl TelemetrySource for InMemoryTelemetry {
    async fn fetch_latest(&self) -> Result<Option<PlantSnapshot>, TelemetryError> {
        let rows = self
            .rows
            .read()
            .map_err(|e| TelemetryError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(rows.last().cloned())
    }

    async fn fetch_history(
        &self,
        limit: usize,
        filter: &HistoryFilter,
    ) -> Result<Vec<PlantSnapshot>, TelemetryError> {
        let rows = self
            .rows
            .read()
            .map_err(|e| TelemetryError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(rows
            .iter()
            .rev()
            .filter(|s| filter.matches(s))
            .take(limit)
            .cloned()
            .collect())
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}
