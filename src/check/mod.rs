//! Check verdict model -- per-site outcomes and aggregated run records.

pub mod evaluator;
pub mod runner;

pub use evaluator::evaluate;
pub use runner::run_checks;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Up/down classification for one site in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Up,
    Down,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteStatus::Up => write!(f, "up"),
            SiteStatus::Down => write!(f, "down"),
        }
    }
}

/// Why a site was classified as down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    ConnectionError,
    StatusMismatch,
    KeywordMissing,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "request timed out"),
            FailureReason::ConnectionError => write!(f, "connection error - site may be down"),
            FailureReason::StatusMismatch => write!(f, "unexpected HTTP status"),
            FailureReason::KeywordMissing => write!(f, "expected content missing"),
        }
    }
}

/// Result of checking one website. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub url: String,
    pub status: SiteStatus,

    /// Observed status code; absent when no response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    /// Latency of the successful (or final failed) attempt.
    pub response_time_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,

    /// Attempts actually made, 1 ..= retry_attempts + 1.
    pub attempts: u32,
}

impl CheckOutcome {
    pub fn is_up(&self) -> bool {
        self.status == SiteStatus::Up
    }
}

/// Aggregate figures for one run, precomputed for status output and charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_sites: usize,
    pub sites_up: usize,
    pub sites_down: usize,

    /// Mean latency over passing sites; 0 when none passed.
    pub average_response_time_ms: u64,
}

/// One complete evaluation pass over all configured sites. The unit
/// appended to the rolling history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run start time.
    pub timestamp: DateTime<Utc>,
    pub overall_status: SiteStatus,
    pub summary: RunSummary,

    /// One entry per configured site, in configuration order.
    pub outcomes: Vec<CheckOutcome>,
}

impl RunRecord {
    pub fn new(timestamp: DateTime<Utc>, outcomes: Vec<CheckOutcome>) -> Self {
        let sites_up = outcomes.iter().filter(|o| o.is_up()).count();
        let sites_down = outcomes.len() - sites_up;

        let overall_status = if sites_down == 0 {
            SiteStatus::Up
        } else {
            SiteStatus::Down
        };

        let up_times: Vec<u64> = outcomes
            .iter()
            .filter(|o| o.is_up())
            .map(|o| o.response_time_ms)
            .collect();
        let average_response_time_ms = if up_times.is_empty() {
            0
        } else {
            up_times.iter().sum::<u64>() / up_times.len() as u64
        };

        Self {
            timestamp,
            overall_status,
            summary: RunSummary {
                total_sites: outcomes.len(),
                sites_up,
                sites_down,
                average_response_time_ms,
            },
            outcomes,
        }
    }

    pub fn failed_outcomes(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.is_up())
    }
}
