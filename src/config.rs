use crate::constants::{auth, network};
use crate::services::logger::LogLevel;
use std::time::Duration;

/// Process configuration, built once at startup and handed to [`crate::app::App`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub timeout_ms: u64,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub secret_name: String,
    pub credential_ttl_ms: u64,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: network::DEFAULT_BASE_URL.to_string(),
            timeout_ms: network::TIMEOUT_API_REQUEST_MS,
            api_key: None,
            project_id: None,
            secret_name: auth::DEFAULT_SECRET_NAME.to_string(),
            credential_ttl_ms: 0,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |key: &str| text(key).and_then(|v| v.parse::<u64>().ok());

        let defaults = Self::default();
        Self {
            base_url: text("JULES_API_BASE_URL").unwrap_or(defaults.base_url),
            timeout_ms: number("JULES_TIMEOUT_MS")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.timeout_ms),
            api_key: text("JULES_API_KEY"),
            project_id: text("GOOGLE_CLOUD_PROJECT"),
            secret_name: text("JULES_API_KEY_SECRET_NAME").unwrap_or(defaults.secret_name),
            credential_ttl_ms: number("JULES_CREDENTIAL_TTL_MS").unwrap_or(0),
            log_level: text("LOG_LEVEL")
                .map(|v| LogLevel::parse(&v))
                .unwrap_or(defaults.log_level),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
