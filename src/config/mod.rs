//! Configuration loading -- JSON schema, defaults, validation.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no websites configured")]
    NoWebsites,

    #[error("website #{index} has an empty '{field}' field")]
    EmptyField { index: usize, field: &'static str },

    #[error("website '{name}' has a zero timeout")]
    ZeroTimeout { name: String },
}

/// A single monitored website as declared in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct Website {
    /// Display label used in alerts and reports.
    pub name: String,

    /// Address to fetch.
    pub url: String,

    /// Per-attempt timeout in seconds, connect through body read.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// HTTP status code that counts as a pass.
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,

    /// Keywords the response body must all contain (case-insensitive).
    /// Empty list skips the content check.
    #[serde(default)]
    pub content_keywords: Vec<String>,
}

/// Check behaviour shared by every website in a run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Extra attempts after a transport failure. 0 means a single attempt.
    pub retry_attempts: u32,

    /// Seconds to sleep between failed attempts.
    pub retry_delay: u64,

    /// User-Agent header sent with every probe.
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retry_attempts: 2,
            retry_delay: 5,
            user_agent: default_user_agent(),
        }
    }
}

/// Where downtime alerts go.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Recipient address.
    pub email: String,

    /// Prepended to every alert subject.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub websites: Vec<Website>,
    pub notification: NotificationConfig,
    #[serde(default)]
    pub settings: Settings,
}

fn default_timeout() -> u64 {
    10
}

fn default_expected_status() -> u16 {
    200
}

fn default_subject_prefix() -> String {
    "[WEBSITE ALERT]".to_string()
}

fn default_user_agent() -> String {
    format!("canary-monitor/{}", env!("CARGO_PKG_VERSION"))
}

/// Load and validate the configuration file.
/// Any failure here is fatal: without a site list there is nothing to run.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.websites.is_empty() {
        return Err(ConfigError::NoWebsites);
    }

    for (index, site) in config.websites.iter().enumerate() {
        if site.name.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                index,
                field: "name",
            });
        }
        if site.url.trim().is_empty() {
            return Err(ConfigError::EmptyField { index, field: "url" });
        }
        if site.timeout == 0 {
            return Err(ConfigError::ZeroTimeout {
                name: site.name.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_full_config() {
        let file = write_config(
            r#"{
                "websites": [
                    {
                        "name": "Example",
                        "url": "https://example.com",
                        "timeout": 5,
                        "expected_status": 200,
                        "content_keywords": ["welcome"]
                    }
                ],
                "notification": {
                    "email": "ops@example.com",
                    "subject_prefix": "[ALERT]"
                },
                "settings": {
                    "retry_attempts": 1,
                    "retry_delay": 2,
                    "user_agent": "test-agent"
                }
            }"#,
        );

        let config = load(file.path()).unwrap();
        assert_eq!(config.websites.len(), 1);
        assert_eq!(config.websites[0].timeout, 5);
        assert_eq!(config.websites[0].content_keywords, vec!["welcome"]);
        assert_eq!(config.notification.subject_prefix, "[ALERT]");
        assert_eq!(config.settings.retry_attempts, 1);
        assert_eq!(config.settings.user_agent, "test-agent");
    }

    #[test]
    fn applies_defaults_for_optional_fields() {
        let file = write_config(
            r#"{
                "websites": [{"name": "Example", "url": "https://example.com"}],
                "notification": {"email": "ops@example.com"}
            }"#,
        );

        let config = load(file.path()).unwrap();
        let site = &config.websites[0];
        assert_eq!(site.timeout, 10);
        assert_eq!(site.expected_status, 200);
        assert!(site.content_keywords.is_empty());
        assert_eq!(config.notification.subject_prefix, "[WEBSITE ALERT]");
        assert_eq!(config.settings.retry_attempts, 2);
        assert_eq!(config.settings.retry_delay, 5);
    }

    #[test]
    fn rejects_empty_site_list() {
        let file = write_config(
            r#"{"websites": [], "notification": {"email": "ops@example.com"}}"#,
        );

        assert!(matches!(load(file.path()), Err(ConfigError::NoWebsites)));
    }

    #[test]
    fn rejects_blank_site_name() {
        let file = write_config(
            r#"{
                "websites": [{"name": "  ", "url": "https://example.com"}],
                "notification": {"email": "ops@example.com"}
            }"#,
        );

        assert!(matches!(
            load(file.path()),
            Err(ConfigError::EmptyField { field: "name", .. })
        ));
    }

    #[test]
    fn rejects_missing_file() {
        let result = load(Path::new("does/not/exist.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
