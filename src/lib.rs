//! Canary -- scheduled website uptime monitoring.
//!
//! This crate provides the core library for the check pipeline: HTTP
//! probing with retry, verdict evaluation, rolling history persistence,
//! reporting and email alerting. Each invocation is a fresh short-lived
//! process; an external scheduler (cron, CI) provides the cadence.

pub mod alert;
pub mod check;
pub mod config;
pub mod dashboard;
pub mod history;
pub mod probe;
pub mod report;

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::alert::{Mailer, SmtpMailer};
use crate::check::RunRecord;
use crate::history::HistoryStore;

/// Run one complete monitoring pass: probe every configured site, roll
/// the history window forward, write status artifacts, dispatch alerts.
///
/// Returns the aggregated record. Only configuration problems abort the
/// run; history and alert failures are logged and recovered.
pub async fn run_check(config_path: &Path, cache_dir: &Path) -> Result<RunRecord> {
    // 1. Load configuration (fatal on failure: nothing can be evaluated)
    let config = config::load(config_path)?;
    info!(sites = config.websites.len(), "configuration loaded");

    // 2. Evaluate all sites
    let record = check::run_checks(&config.websites, &config.settings).await?;
    info!(
        total = record.summary.total_sites,
        up = record.summary.sites_up,
        down = record.summary.sites_down,
        "run complete"
    );

    // 3. Roll the history window forward and persist
    let store = HistoryStore::new(cache_dir);
    let mut log = store.load();
    log.append(record.clone());
    if let Err(e) = store.persist(&log) {
        warn!(error = %e, "failed to persist history");
    }
    if let Err(e) = store.save_current_status(&record) {
        warn!(error = %e, "failed to write status snapshot");
    }

    // 4. CI step summary (no-op outside CI)
    if let Err(e) = report::write_step_summary(&record) {
        warn!(error = %e, "failed to write step summary");
    }

    // 5. Alert on downtime
    let mailer = SmtpMailer::from_env();
    if mailer.is_none() {
        info!("SMTP environment not configured, alert delivery disabled");
    }
    alert::dispatch(
        &record,
        &config.notification,
        mailer.as_ref().map(|m| m as &dyn Mailer),
    )
    .await;

    Ok(record)
}
