//! Ingestion configuration
//!
//! Configuration for the request governor, the provider client, the two
//! scheduled drivers and the notification job. Every value has a default and
//! can be overridden from the environment.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Provider calls allowed before the governor enforces a cooldown.
pub const DEFAULT_GOVERNOR_THRESHOLD: u32 = 9;

/// Length of the governor cooldown in seconds.
pub const DEFAULT_GOVERNOR_COOLDOWN_SECS: u64 = 60;

/// How often the cooldown countdown is logged.
pub const DEFAULT_GOVERNOR_PROGRESS_INTERVAL_SECS: u64 = 10;

/// Default provider base URL.
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.football-data.org/v4";

/// Default provider request timeout in seconds.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Only competitions served under this plan are ingested.
pub const DEFAULT_PROVIDER_PLAN: &str = "TIER_ONE";

/// Ingestion cadence: every Monday at 03:00.
pub const DEFAULT_INGEST_SCHEDULE: &str = "0 3 * * Mon";

/// Notification cadence: every day at 07:00.
pub const DEFAULT_NOTIFY_SCHEDULE: &str = "0 7 * * *";

/// Days ahead the notification job asks the provider about.
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 7;

/// Maximum concurrent sub-resource fetches within one job.
pub const DEFAULT_FAN_OUT: usize = 4;

/// Reference time zone used to decide what "today" means.
pub const DEFAULT_REFERENCE_UTC_OFFSET: &str = "+00:00";

/// Top-level ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Whether the scheduled drivers are started at all
    pub enabled: bool,
    pub governor: GovernorConfig,
    pub provider: ProviderConfig,
    pub schedule: ScheduleConfig,
    pub notifications: NotificationConfig,
    /// Maximum concurrent sub-resource fetches within one job
    pub fan_out: usize,
}

/// Request governor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GovernorConfig {
    pub threshold: u32,
    pub cooldown_secs: u64,
    pub progress_interval_secs: u64,
}

/// Provider HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Sent as `X-Auth-Token`; requests go out unauthenticated when empty
    pub api_token: String,
    pub timeout_secs: u64,
    /// Data plan a competition must be served under to be ingested
    pub plan: String,
}

/// Cron cadences of the two scheduled drivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub ingest_cron: String,
    pub notify_cron: String,
}

/// Notification job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub lookahead_days: u32,
    /// UTC offset such as "+01:00"
    pub reference_utc_offset: String,
    /// When set, digests are POSTed here; otherwise they are only logged
    pub webhook_url: Option<String>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_GOVERNOR_THRESHOLD,
            cooldown_secs: DEFAULT_GOVERNOR_COOLDOWN_SECS,
            progress_interval_secs: DEFAULT_GOVERNOR_PROGRESS_INTERVAL_SECS,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            api_token: String::new(),
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            plan: DEFAULT_PROVIDER_PLAN.to_string(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            ingest_cron: DEFAULT_INGEST_SCHEDULE.to_string(),
            notify_cron: DEFAULT_NOTIFY_SCHEDULE.to_string(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            reference_utc_offset: DEFAULT_REFERENCE_UTC_OFFSET.to_string(),
            webhook_url: None,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            governor: GovernorConfig::default(),
            provider: ProviderConfig::default(),
            schedule: ScheduleConfig::default(),
            notifications: NotificationConfig::default(),
            fan_out: DEFAULT_FAN_OUT,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            enabled: env_or("INGEST_ENABLED", true),
            governor: GovernorConfig::from_env(),
            provider: ProviderConfig {
                base_url: env_string("PROVIDER_BASE_URL", DEFAULT_PROVIDER_BASE_URL),
                api_token: env_string("PROVIDER_API_TOKEN", ""),
                timeout_secs: env_or("PROVIDER_TIMEOUT_SECS", DEFAULT_PROVIDER_TIMEOUT_SECS),
                plan: env_string("PROVIDER_PLAN", DEFAULT_PROVIDER_PLAN),
            },
            schedule: ScheduleConfig {
                ingest_cron: env_string("INGEST_SCHEDULE", DEFAULT_INGEST_SCHEDULE),
                notify_cron: env_string("NOTIFY_SCHEDULE", DEFAULT_NOTIFY_SCHEDULE),
            },
            notifications: NotificationConfig {
                lookahead_days: env_or("NOTIFY_LOOKAHEAD_DAYS", DEFAULT_LOOKAHEAD_DAYS),
                reference_utc_offset: env_string(
                    "NOTIFY_REFERENCE_UTC_OFFSET",
                    DEFAULT_REFERENCE_UTC_OFFSET,
                ),
                webhook_url: std::env::var("NOTIFY_WEBHOOK_URL")
                    .ok()
                    .filter(|s| !s.is_empty()),
            },
            fan_out: env_or("INGEST_FAN_OUT", DEFAULT_FAN_OUT),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.governor.validate()?;

        if self.provider.base_url.is_empty() {
            anyhow::bail!("PROVIDER_BASE_URL cannot be empty");
        }
        if self.provider.timeout_secs == 0 {
            anyhow::bail!("PROVIDER_TIMEOUT_SECS must be greater than 0");
        }
        if self.fan_out == 0 {
            anyhow::bail!("INGEST_FAN_OUT must be greater than 0");
        }

        self.notifications.reference_offset()?;
        Ok(())
    }
}

impl GovernorConfig {
    /// Load governor settings from `GOVERNOR_*` environment variables
    pub fn from_env() -> Self {
        Self {
            threshold: env_or("GOVERNOR_THRESHOLD", DEFAULT_GOVERNOR_THRESHOLD),
            cooldown_secs: env_or("GOVERNOR_COOLDOWN_SECS", DEFAULT_GOVERNOR_COOLDOWN_SECS),
            progress_interval_secs: env_or(
                "GOVERNOR_PROGRESS_INTERVAL_SECS",
                DEFAULT_GOVERNOR_PROGRESS_INTERVAL_SECS,
            ),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.threshold == 0 {
            anyhow::bail!("GOVERNOR_THRESHOLD must be greater than 0");
        }
        if self.progress_interval_secs == 0 {
            anyhow::bail!("GOVERNOR_PROGRESS_INTERVAL_SECS must be greater than 0");
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NotificationConfig {
    /// Parse the configured reference offset
    pub fn reference_offset(&self) -> anyhow::Result<FixedOffset> {
        self.reference_utc_offset.parse::<FixedOffset>().map_err(|e| {
            anyhow::anyhow!(
                "NOTIFY_REFERENCE_UTC_OFFSET '{}' is not a valid UTC offset: {}",
                self.reference_utc_offset,
                e
            )
        })
    }
}
