//! Rolling history persistence -- bounded run log and status snapshot.
//!
//! Each invocation is a fresh process, so the trend data lives in a JSON
//! cache file between runs: load at run start, append exactly one record,
//! evict from the front past the retention bound, persist at run end.
//! Single writer per run; overlap prevention is the scheduler's problem.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::check::{FailureReason, RunRecord, RunSummary, SiteStatus};

/// Maximum retained run records. The history file rides in a CI cache, so
/// the window stays small.
pub const MAX_HISTORY_ENTRIES: usize = 500;

const HISTORY_FILE: &str = "monitoring_history.json";
const STATUS_FILE: &str = "current_status.json";

/// Bounded FIFO of run records, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    entries: Vec<RunRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RunRecord] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&RunRecord> {
        self.entries.last()
    }

    /// Append a record, evicting oldest entries past the retention bound.
    pub fn append(&mut self, record: RunRecord) {
        self.entries.push(record);
        if self.entries.len() > MAX_HISTORY_ENTRIES {
            let excess = self.entries.len() - MAX_HISTORY_ENTRIES;
            self.entries.drain(..excess);
        }
    }
}

/// Snapshot of the most recent run, written beside the history for cheap
/// consumption by the status command and external tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub overall_status: SiteStatus,
    pub summary: RunSummary,
    pub sites: BTreeMap<String, SiteSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSnapshot {
    pub url: String,
    pub status: SiteStatus,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

impl StatusSnapshot {
    pub fn from_record(record: &RunRecord) -> Self {
        let sites = record
            .outcomes
            .iter()
            .map(|o| {
                (
                    o.name.clone(),
                    SiteSnapshot {
                        url: o.url.clone(),
                        status: o.status,
                        response_time_ms: o.response_time_ms,
                        http_status: o.http_status,
                        failure: o.failure,
                    },
                )
            })
            .collect();

        Self {
            timestamp: record.timestamp,
            overall_status: record.overall_status,
            summary: record.summary.clone(),
            sites,
        }
    }
}

/// Loads and persists the rolling history under a cache directory.
pub struct HistoryStore {
    cache_dir: PathBuf,
}

impl HistoryStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    fn history_path(&self) -> PathBuf {
        self.cache_dir.join(HISTORY_FILE)
    }

    fn status_path(&self) -> PathBuf {
        self.cache_dir.join(STATUS_FILE)
    }

    /// Load the persisted history. A missing or unreadable store yields an
    /// empty log: losing trend data must not abort the run.
    pub fn load(&self) -> HistoryLog {
        let path = self.history_path();
        if !path.exists() {
            info!("no history found in cache, starting fresh");
            return HistoryLog::new();
        }

        match read_log(&path) {
            Ok(log) => {
                info!(entries = log.len(), "loaded history from cache");
                log
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not load history, starting fresh");
                HistoryLog::new()
            }
        }
    }

    /// Write the log back for the next invocation.
    pub fn persist(&self, log: &HistoryLog) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("failed to create cache dir '{}'", self.cache_dir.display())
        })?;

        let path = self.history_path();
        let raw = serde_json::to_string_pretty(log)?;
        fs::write(&path, raw)
            .with_context(|| format!("failed to write history to '{}'", path.display()))?;

        info!(entries = log.len(), "saved history to cache");
        Ok(())
    }

    /// Write the latest-run snapshot.
    pub fn save_current_status(&self, record: &RunRecord) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("failed to create cache dir '{}'", self.cache_dir.display())
        })?;

        let path = self.status_path();
        let raw = serde_json::to_string_pretty(&StatusSnapshot::from_record(record))?;
        fs::write(&path, raw)
            .with_context(|| format!("failed to write status to '{}'", path.display()))?;

        Ok(())
    }

    pub fn load_current_status(&self) -> Result<StatusSnapshot> {
        let path = self.status_path();
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("no status snapshot at '{}'", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("corrupt status snapshot at '{}'", path.display()))
    }
}

fn read_log(path: &Path) -> Result<HistoryLog> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
