//! Downtime alerting -- message composition and SMTP delivery.
//!
//! Delivery problems are never fatal: the check-and-history pipeline must
//! complete and persist whether or not the operator can be reached.

use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::check::RunRecord;
use crate::config::NotificationConfig;

const DEFAULT_SMTP_PORT: u16 = 587;

/// A composed downtime notification, transport-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Seam for the dispatcher: production uses [`SmtpMailer`], tests record
/// messages instead of delivering them.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &AlertMessage) -> Result<()>;
}

/// Compose the notification for a run, or None when every site is up.
pub fn compose(record: &RunRecord, notification: &NotificationConfig) -> Option<AlertMessage> {
    let failed: Vec<_> = record.failed_outcomes().collect();
    if failed.is_empty() {
        return None;
    }

    let subject = if failed.len() == 1 {
        format!("{} {} is down", notification.subject_prefix, failed[0].name)
    } else {
        format!(
            "{} {} websites are down",
            notification.subject_prefix,
            failed.len()
        )
    };

    let mut body = String::from("Website monitoring alert:\n\n");
    for outcome in &failed {
        body.push_str(&format!("{}\n", outcome.name));
        body.push_str(&format!("   URL: {}\n", outcome.url));
        if let Some(reason) = outcome.failure {
            body.push_str(&format!("   Error: {}\n", reason));
        }
        if let Some(code) = outcome.http_status {
            body.push_str(&format!("   Status Code: {}\n", code));
        }
        body.push_str(&format!(
            "   Response Time: {}ms\n\n",
            outcome.response_time_ms
        ));
    }
    body.push_str(&format!(
        "Check performed at: {}\n",
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    body.push_str("This alert was sent by canary");

    Some(AlertMessage {
        to: notification.email.clone(),
        subject,
        body,
    })
}

/// Dispatch the alert for a run, if one is due. Pass `None` as the mailer
/// when no transport is configured; the gap is logged and the run goes on.
pub async fn dispatch(
    record: &RunRecord,
    notification: &NotificationConfig,
    mailer: Option<&dyn Mailer>,
) {
    let Some(message) = compose(record, notification) else {
        return;
    };

    let Some(mailer) = mailer else {
        warn!(
            sites_down = record.summary.sites_down,
            "sites are down but no mail transport is configured, skipping alert"
        );
        return;
    };

    match mailer.send(&message).await {
        Ok(()) => info!(to = %message.to, subject = %message.subject, "alert email sent"),
        Err(e) => warn!(error = %e, "failed to send alert email"),
    }
}

/// SMTP delivery over STARTTLS, configured from the environment.
pub struct SmtpMailer {
    server: String,
    port: u16,
    username: String,
    password: String,
}

impl SmtpMailer {
    /// Build from the SMTP_* environment variables. Returns None when the
    /// configuration is incomplete; alerting is then disabled for the run.
    pub fn from_env() -> Option<Self> {
        let server = std::env::var("SMTP_SERVER").ok()?;
        let username = std::env::var("SMTP_USERNAME").ok()?;
        let password = std::env::var("SMTP_PASSWORD").ok()?;
        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_SMTP_PORT);

        Some(Self {
            server,
            port,
            username,
            password,
        })
    }
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        let from: Mailbox = self
            .username
            .parse()
            .context("SMTP_USERNAME is not a valid sender address")?;
        let to: Mailbox = message
            .to
            .parse()
            .context("notification email is not a valid address")?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .body(message.body.clone())
            .context("failed to build alert email")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.server)
            .context("invalid SMTP server")?
            .port(self.port)
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.clone(),
            ))
            .build();

        transport
            .send(email)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::check::{CheckOutcome, FailureReason, RunRecord, SiteStatus};

    struct RecordingMailer {
        sent: Mutex<Vec<AlertMessage>>,
    }

    impl RecordingMailer {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &AlertMessage) -> Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn notification() -> NotificationConfig {
        NotificationConfig {
            email: "ops@example.com".to_string(),
            subject_prefix: "[WEBSITE ALERT]".to_string(),
        }
    }

    fn outcome(name: &str, status: SiteStatus, failure: Option<FailureReason>) -> CheckOutcome {
        CheckOutcome {
            name: name.to_string(),
            url: format!("https://{}.example.com", name),
            status,
            http_status: match failure {
                Some(FailureReason::Timeout) | Some(FailureReason::ConnectionError) => None,
                _ => Some(if failure.is_some() { 503 } else { 200 }),
            },
            response_time_ms: 150,
            failure,
            attempts: 1,
        }
    }

    #[test]
    fn no_alert_when_everything_is_up() {
        let record = RunRecord::new(
            Utc::now(),
            vec![outcome("alpha", SiteStatus::Up, None)],
        );
        assert_eq!(compose(&record, &notification()), None);
    }

    #[test]
    fn single_failure_uses_singular_subject() {
        let record = RunRecord::new(
            Utc::now(),
            vec![
                outcome("alpha", SiteStatus::Up, None),
                outcome("beta", SiteStatus::Down, Some(FailureReason::StatusMismatch)),
                outcome("gamma", SiteStatus::Up, None),
            ],
        );

        let message = compose(&record, &notification()).unwrap();
        assert_eq!(message.subject, "[WEBSITE ALERT] beta is down");
        assert_eq!(message.to, "ops@example.com");
        assert!(message.body.contains("https://beta.example.com"));
        assert!(message.body.contains("Status Code: 503"));
        // Healthy sites never appear in the alert body.
        assert!(!message.body.contains("alpha"));
    }

    #[test]
    fn multiple_failures_use_counted_subject() {
        let record = RunRecord::new(
            Utc::now(),
            vec![
                outcome("alpha", SiteStatus::Down, Some(FailureReason::Timeout)),
                outcome("beta", SiteStatus::Down, Some(FailureReason::KeywordMissing)),
            ],
        );

        let message = compose(&record, &notification()).unwrap();
        assert_eq!(message.subject, "[WEBSITE ALERT] 2 websites are down");
        assert!(message.body.contains("request timed out"));
        assert!(message.body.contains("expected content missing"));
    }

    #[tokio::test]
    async fn dispatch_hands_one_payload_to_the_mailer() {
        let record = RunRecord::new(
            Utc::now(),
            vec![
                outcome("alpha", SiteStatus::Up, None),
                outcome("beta", SiteStatus::Down, Some(FailureReason::ConnectionError)),
                outcome("gamma", SiteStatus::Up, None),
            ],
        );
        let mailer = RecordingMailer::new();

        dispatch(&record, &notification(), Some(&mailer)).await;

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.contains("beta"));
    }

    #[tokio::test]
    async fn dispatch_skips_mailer_when_up() {
        let record = RunRecord::new(
            Utc::now(),
            vec![outcome("alpha", SiteStatus::Up, None)],
        );
        let mailer = RecordingMailer::new();

        dispatch(&record, &notification(), Some(&mailer)).await;

        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dispatch_without_transport_does_not_panic() {
        let record = RunRecord::new(
            Utc::now(),
            vec![outcome("alpha", SiteStatus::Down, Some(FailureReason::Timeout))],
        );

        dispatch(&record, &notification(), None).await;
    }
}
