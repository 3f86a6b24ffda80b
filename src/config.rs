//! Centralized configuration management for pms-tui

use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, Context};

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_SESSION_FILE: &str = "./pms_session.json";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every API path is resolved against
    pub api_base_url: String,
    /// Persisted session (token + user name) location
    pub session_file: PathBuf,
    /// Notification polling configuration
    pub polling: PollingConfig,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// Background polling configuration
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Seconds between notification fetches
    pub notification_interval_secs: u64,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            notification_interval_secs: 5,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: "pms-tui/0.1.0".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            session_file: DEFAULT_SESSION_FILE.into(),
            polling: PollingConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let api_base_url = std::env::var("PMS_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let session_file = std::env::var("PMS_SESSION_FILE")
            .unwrap_or_else(|_| DEFAULT_SESSION_FILE.to_string())
            .into();

        let polling = PollingConfig {
            notification_interval_secs: parse_env_var("PMS_POLL_INTERVAL_SECS")?.unwrap_or(5),
        };

        let http = HttpConfig {
            timeout_seconds: parse_env_var("PMS_HTTP_TIMEOUT_SECONDS")?.unwrap_or(30),
            user_agent: std::env::var("PMS_USER_AGENT")
                .unwrap_or_else(|_| "pms-tui/0.1.0".to_string()),
        };

        Ok(Config {
            api_base_url,
            session_file,
            polling,
            http,
        })
    }

    /// Base URL without a trailing slash, ready for path concatenation
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Get notification poll period as Duration
    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.notification_interval_secs)
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid PMS_API_URL: {}", self.api_base_url))?;

        if self.polling.notification_interval_secs == 0 {
            return Err(anyhow::anyhow!("PMS_POLL_INTERVAL_SECS must be greater than zero"));
        }

        if let Some(parent) = self.session_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(anyhow::anyhow!(
                    "Session file directory does not exist: {}",
                    parent.display()
                ));
            }
        }

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}
