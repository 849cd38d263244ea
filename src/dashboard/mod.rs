//! Dashboard rendering -- one self-contained HTML page from the history.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use askama::Template;
use serde::Serialize;

use crate::history::HistoryLog;

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    generated_at: String,
    has_data: bool,
    total_sites: usize,
    sites_up: usize,
    sites_down: usize,
    average_response_time_ms: u64,
    total_runs: usize,
    sites: Vec<SiteCard>,
    timeline_json: String,
    response_times_json: String,
}

struct SiteCard {
    name: String,
    url: String,
    status: String,
    uptime_percent: String,
    last_response_time_ms: u64,
}

#[derive(Serialize)]
struct TimelinePoint {
    t: String,
    up: usize,
    down: usize,
}

#[derive(Serialize)]
struct SeriesPoint {
    t: String,
    ms: u64,
}

/// Render the dashboard HTML for the given history. Empty history renders
/// an empty-state page, not an error.
pub fn render(log: &HistoryLog) -> Result<String> {
    let latest = log.latest();

    let timeline: Vec<TimelinePoint> = log
        .entries()
        .iter()
        .map(|record| TimelinePoint {
            t: record.timestamp.format("%m-%d %H:%M").to_string(),
            up: record.summary.sites_up,
            down: record.summary.sites_down,
        })
        .collect();

    let mut response_times: BTreeMap<String, Vec<SeriesPoint>> = BTreeMap::new();
    for record in log.entries() {
        for outcome in &record.outcomes {
            if outcome.is_up() {
                response_times
                    .entry(outcome.name.clone())
                    .or_default()
                    .push(SeriesPoint {
                        t: record.timestamp.format("%m-%d %H:%M").to_string(),
                        ms: outcome.response_time_ms,
                    });
            }
        }
    }

    let template = DashboardTemplate {
        generated_at: chrono::Utc::now()
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        has_data: latest.is_some(),
        total_sites: latest.map(|r| r.summary.total_sites).unwrap_or(0),
        sites_up: latest.map(|r| r.summary.sites_up).unwrap_or(0),
        sites_down: latest.map(|r| r.summary.sites_down).unwrap_or(0),
        average_response_time_ms: latest.map(|r| r.summary.average_response_time_ms).unwrap_or(0),
        total_runs: log.len(),
        sites: site_cards(log),
        timeline_json: serde_json::to_string(&timeline)?,
        response_times_json: serde_json::to_string(&response_times)?,
    };

    template.render().context("failed to render dashboard")
}

/// Render and write the dashboard to a file.
pub fn write(log: &HistoryLog, path: &Path) -> Result<()> {
    let html = render(log)?;
    std::fs::write(path, html)
        .with_context(|| format!("failed to write dashboard to '{}'", path.display()))
}

/// Per-site cards: current status from the latest run, uptime over the
/// whole retained window.
fn site_cards(log: &HistoryLog) -> Vec<SiteCard> {
    let Some(latest) = log.latest() else {
        return Vec::new();
    };

    let mut counts: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for record in log.entries() {
        for outcome in &record.outcomes {
            let (total, up) = counts.entry(outcome.name.as_str()).or_default();
            *total += 1;
            if outcome.is_up() {
                *up += 1;
            }
        }
    }

    latest
        .outcomes
        .iter()
        .map(|outcome| {
            let uptime = counts
                .get(outcome.name.as_str())
                .map(|(total, up)| *up as f64 / *total as f64 * 100.0)
                .unwrap_or(0.0);
            SiteCard {
                name: outcome.name.clone(),
                url: outcome.url.clone(),
                status: outcome.status.to_string(),
                uptime_percent: format!("{:.2}", uptime),
                last_response_time_ms: outcome.response_time_ms,
            }
        })
        .collect()
}
