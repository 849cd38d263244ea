//! HTTP probe execution -- timed fetches with transport-level retry.
//!
//! A probe either yields a received HTTP response (status, body, latency)
//! or a transport failure after exhausting the retry budget. Validation of
//! the response itself (status code, content keywords) happens in the
//! evaluator, not here: a received response is never retried, whatever its
//! status code.

use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{Settings, Website};

/// Transport-level failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportError {
    Timeout,
    ConnectionError,
}

/// Raw result of probing one site.
#[derive(Debug, Clone)]
pub enum ProbeResult {
    /// An HTTP response was received on some attempt.
    Replied {
        http_status: u16,
        body: String,
        response_time_ms: u64,
        attempts: u32,
    },
    /// Every attempt failed at the transport level. Carries the class of
    /// the final error and the latency of the final attempt.
    Failed {
        error: TransportError,
        response_time_ms: u64,
        attempts: u32,
    },
}

/// Seam for the orchestrator: production uses [`HttpProbe`], tests script
/// results without a network.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, site: &Website) -> ProbeResult;
}

/// Probes sites over HTTP with reqwest.
pub struct HttpProbe {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpProbe {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            retry_attempts: settings.retry_attempts,
            retry_delay: Duration::from_secs(settings.retry_delay),
        })
    }

    /// One attempt: fetch the URL and read the whole body, both bounded by
    /// the site's timeout. Returns the elapsed time either way.
    async fn fetch_once(&self, site: &Website) -> (Result<(u16, String), TransportError>, u64) {
        let timeout = Duration::from_secs(site.timeout);
        let start = Instant::now();

        let outcome = match self.client.get(site.url.as_str()).timeout(timeout).send().await {
            Ok(response) => {
                let http_status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => Ok((http_status, body)),
                    Err(e) => Err(classify(&e)),
                }
            }
            Err(e) => Err(classify(&e)),
        };

        (outcome, start.elapsed().as_millis() as u64)
    }
}

fn classify(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::ConnectionError
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, site: &Website) -> ProbeResult {
        let max_attempts = self.retry_attempts + 1;
        let mut last_error = TransportError::ConnectionError;
        let mut last_elapsed = 0;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                debug!(site = %site.name, attempt, max_attempts, "retrying after delay");
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.fetch_once(site).await {
                (Ok((http_status, body)), response_time_ms) => {
                    return ProbeResult::Replied {
                        http_status,
                        body,
                        response_time_ms,
                        attempts: attempt,
                    };
                }
                (Err(error), response_time_ms) => {
                    warn!(site = %site.name, attempt, ?error, "probe attempt failed");
                    last_error = error;
                    last_elapsed = response_time_ms;
                }
            }
        }

        ProbeResult::Failed {
            error: last_error,
            response_time_ms: last_elapsed,
            attempts: max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    use super::*;

    /// Serve a canned HTTP response on a loopback port, one per connection.
    fn serve(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        format!("http://{}/", addr)
    }

    fn site(url: &str) -> Website {
        Website {
            name: "test-site".to_string(),
            url: url.to_string(),
            timeout: 2,
            expected_status: 200,
            content_keywords: Vec::new(),
        }
    }

    fn settings(retry_attempts: u32) -> Settings {
        Settings {
            retry_attempts,
            retry_delay: 0,
            user_agent: "canary-test".to_string(),
        }
    }

    #[tokio::test]
    async fn first_successful_attempt_is_not_retried() {
        let url = serve("200 OK", "hello");
        let probe = HttpProbe::new(&settings(3)).unwrap();

        match probe.probe(&site(&url)).await {
            ProbeResult::Replied {
                http_status,
                body,
                attempts,
                ..
            } => {
                assert_eq!(http_status, 200);
                assert_eq!(body, "hello");
                assert_eq!(attempts, 1);
            }
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn received_response_is_never_retried_even_on_error_status() {
        let url = serve("503 Service Unavailable", "try later");
        let probe = HttpProbe::new(&settings(2)).unwrap();

        match probe.probe(&site(&url)).await {
            ProbeResult::Replied {
                http_status,
                attempts,
                ..
            } => {
                assert_eq!(http_status, 503);
                assert_eq!(attempts, 1);
            }
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connection_refused_exhausts_the_retry_budget() {
        // Bind then drop to get a loopback port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}/", port);
        let probe = HttpProbe::new(&settings(2)).unwrap();

        match probe.probe(&site(&url)).await {
            ProbeResult::Failed {
                error, attempts, ..
            } => {
                assert_eq!(error, TransportError::ConnectionError);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected a transport failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn zero_retries_means_a_single_attempt() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}/", port);
        let probe = HttpProbe::new(&settings(0)).unwrap();

        match probe.probe(&site(&url)).await {
            ProbeResult::Failed { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("expected a transport failure, got {:?}", other),
        }
    }
}
