//! Run orchestration -- fans out per-site checks, aggregates one record.

use anyhow::{bail, Result};
use chrono::Utc;
use futures::future;
use tracing::{info, warn};

use crate::config::{Settings, Website};
use crate::probe::{HttpProbe, Probe};

use super::{evaluate, CheckOutcome, RunRecord};

/// Evaluate every configured site and aggregate one run record.
///
/// Sites are probed concurrently; outcome order mirrors configuration
/// order regardless of completion order. Individual site failures are
/// recorded as down outcomes, never escalated -- only an empty site list
/// is fatal.
pub async fn run_checks(websites: &[Website], settings: &Settings) -> Result<RunRecord> {
    if websites.is_empty() {
        bail!("no websites to check");
    }

    let probe = HttpProbe::new(settings)?;
    Ok(run_with_probe(&probe, websites).await)
}

async fn check_site(probe: &dyn Probe, site: &Website) -> CheckOutcome {
    info!(site = %site.name, url = %site.url, "checking");

    let outcome = evaluate(site, probe.probe(site).await);
    match outcome.failure {
        None => info!(
            site = %site.name,
            response_time_ms = outcome.response_time_ms,
            "site is up"
        ),
        Some(reason) => warn!(
            site = %site.name,
            attempts = outcome.attempts,
            %reason,
            "site is down"
        ),
    }

    outcome
}

pub(crate) async fn run_with_probe(probe: &dyn Probe, websites: &[Website]) -> RunRecord {
    let started = Utc::now();

    // join_all yields results in input order, so configuration order
    // survives concurrent completion.
    let outcomes =
        future::join_all(websites.iter().map(|site| check_site(probe, site))).await;

    RunRecord::new(started, outcomes)
}
