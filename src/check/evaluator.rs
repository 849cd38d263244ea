//! Site evaluation -- turns a raw probe result into a pass/fail verdict.

use crate::config::Website;
use crate::probe::{ProbeResult, TransportError};

use super::{CheckOutcome, FailureReason, SiteStatus};

impl From<TransportError> for FailureReason {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout => FailureReason::Timeout,
            TransportError::ConnectionError => FailureReason::ConnectionError,
        }
    }
}

/// Compute the final verdict for one site.
///
/// Checks apply in order: transport failure, then status code, then
/// content keywords. Keyword matching is case-insensitive substring
/// containment; an empty keyword list skips the check entirely.
pub fn evaluate(site: &Website, probe: ProbeResult) -> CheckOutcome {
    match probe {
        ProbeResult::Failed {
            error,
            response_time_ms,
            attempts,
        } => CheckOutcome {
            name: site.name.clone(),
            url: site.url.clone(),
            status: SiteStatus::Down,
            http_status: None,
            response_time_ms,
            failure: Some(error.into()),
            attempts,
        },
        ProbeResult::Replied {
            http_status,
            body,
            response_time_ms,
            attempts,
        } => {
            let failure = if http_status != site.expected_status {
                Some(FailureReason::StatusMismatch)
            } else if !keywords_present(&body, &site.content_keywords) {
                Some(FailureReason::KeywordMissing)
            } else {
                None
            };

            CheckOutcome {
                name: site.name.clone(),
                url: site.url.clone(),
                status: if failure.is_some() {
                    SiteStatus::Down
                } else {
                    SiteStatus::Up
                },
                http_status: Some(http_status),
                response_time_ms,
                failure,
                attempts,
            }
        }
    }
}

fn keywords_present(body: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let body = body.to_lowercase();
    keywords.iter().all(|kw| body.contains(&kw.to_lowercase()))
}
