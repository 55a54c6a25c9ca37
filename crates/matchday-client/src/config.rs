//! Configuration for the Matchday client
//!
//! Handles the server URL, request timeout and polling limits.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Client Configuration Constants
// ============================================================================

/// Default Matchday server URL when not specified via environment variable.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Default timeout for a single HTTP request in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Delay between polls when the server sends no usable `Retry-After`.
pub const DEFAULT_POLL_DELAY_SECS: u64 = 3;

/// Processing responses tolerated before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_url: String,
    pub timeout_secs: u64,
    pub default_delay_secs: u64,
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            default_delay_secs: DEFAULT_POLL_DELAY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    /// Load config from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MATCHDAY_SERVER_URL") {
            config.server_url = url;
        }
        if let Some(secs) = parse_env("MATCHDAY_API_TIMEOUT_SECS")? {
            config.timeout_secs = secs;
        }
        if let Some(secs) = parse_env("MATCHDAY_POLL_DELAY_SECS")? {
            config.default_delay_secs = secs;
        }
        if let Some(retries) = parse_env("MATCHDAY_POLL_MAX_RETRIES")? {
            config.max_retries = retries;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(ClientError::config("MATCHDAY_SERVER_URL cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::config(
                "MATCHDAY_API_TIMEOUT_SECS must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn default_delay(&self) -> Duration {
        Duration::from_secs(self.default_delay_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ClientError::config(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.max_retries, 20);
        assert_eq!(config.default_delay(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        std::env::set_var("MATCHDAY_SERVER_URL", "http://matchday.test");
        std::env::set_var("MATCHDAY_POLL_MAX_RETRIES", "5");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.server_url, "http://matchday.test");
        assert_eq!(config.max_retries, 5);

        std::env::set_var("MATCHDAY_POLL_MAX_RETRIES", "many");
        assert!(ClientConfig::from_env().is_err());

        std::env::remove_var("MATCHDAY_SERVER_URL");
        std::env::remove_var("MATCHDAY_POLL_MAX_RETRIES");
    }
}
