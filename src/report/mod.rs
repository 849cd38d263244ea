//! Run reporting -- uptime statistics and CI step summaries.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::check::RunRecord;
use crate::history::HistoryLog;

/// Per-site percentage of passing checks over the trailing window.
pub fn uptime_stats(log: &HistoryLog, hours: i64) -> BTreeMap<String, f64> {
    uptime_stats_at(log, hours, Utc::now())
}

fn uptime_stats_at(log: &HistoryLog, hours: i64, now: DateTime<Utc>) -> BTreeMap<String, f64> {
    let cutoff = now - Duration::hours(hours.max(1));

    let mut counts: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for record in log.entries() {
        if record.timestamp < cutoff {
            continue;
        }
        for outcome in &record.outcomes {
            let (total, up) = counts.entry(outcome.name.clone()).or_default();
            *total += 1;
            if outcome.is_up() {
                *up += 1;
            }
        }
    }

    counts
        .into_iter()
        .map(|(name, (total, up))| (name, up as f64 / total as f64 * 100.0))
        .collect()
}

/// Append a markdown report of the run to the CI step summary file, when
/// the environment provides one. Absence of GITHUB_STEP_SUMMARY is normal
/// outside CI and not an error.
pub fn write_step_summary(record: &RunRecord) -> Result<()> {
    let Ok(path) = std::env::var("GITHUB_STEP_SUMMARY") else {
        debug!("GITHUB_STEP_SUMMARY not set, skipping step summary");
        return Ok(());
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open step summary file '{}'", path))?;
    file.write_all(render_step_summary(record).as_bytes())
        .context("failed to write step summary")?;

    Ok(())
}

fn render_step_summary(record: &RunRecord) -> String {
    let mut out = String::from("# Website Monitoring Report\n\n");

    if record.summary.sites_down > 0 {
        out.push_str(&format!(
            "## Status: {} site{} down\n\n",
            record.summary.sites_down,
            if record.summary.sites_down == 1 { "" } else { "s" }
        ));
    } else {
        out.push_str("## Status: all systems operational\n\n");
    }

    out.push_str("| Website | Link | Status | Response Time | Error |\n");
    out.push_str("|---------|------|--------|---------------|-------|\n");
    for outcome in &record.outcomes {
        let status = if outcome.is_up() { "✅" } else { "❌" };
        let error = match outcome.failure {
            Some(reason) => reason.to_string(),
            None => "None".to_string(),
        };
        out.push_str(&format!(
            "| {} | [{}]({}) | {} | {}ms | {} |\n",
            outcome.name, outcome.url, outcome.url, status, outcome.response_time_ms, error
        ));
    }

    out.push_str(&format!(
        "\nLast check: {}\n",
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}
