//! Digest delivery channels

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use matchday_common::types::{Match, NotificationCandidate};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::storage::StoreError;

/// Errors raised while building or delivering digests
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Digest endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("Could not load users: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// One user's summary of today's matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Digest {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    /// "Today" in the reference offset
    pub date: NaiveDate,
    /// Why the user hears about each match, deduplicated
    pub candidates: Vec<NotificationCandidate>,
    /// Each match once, even when several favorites point at it
    pub matches: Vec<Match>,
}

/// A channel that delivers digests
#[async_trait]
pub trait DigestSender: Send + Sync {
    async fn send_digest(&self, digest: &Digest) -> Result<(), NotifyError>;

    fn channel_name(&self) -> &str;
}

/// Writes each digest as a structured log line
#[derive(Debug, Default)]
pub struct LogDigestSender;

#[async_trait]
impl DigestSender for LogDigestSender {
    async fn send_digest(&self, digest: &Digest) -> Result<(), NotifyError> {
        let match_ids: Vec<_> = digest.matches.iter().map(|m| m.id).collect();
        info!(
            user_id = %digest.user_id,
            email = %digest.email,
            date = %digest.date,
            matches = ?match_ids,
            "Match day digest"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}

/// POSTs each digest as JSON to a fixed URL
#[derive(Debug)]
pub struct WebhookDigestSender {
    url: String,
    client: reqwest::Client,
}

impl WebhookDigestSender {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let url = url.into();
        if url.is_empty() {
            return Err(NotifyError::Config("webhook URL cannot be empty".to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl DigestSender for WebhookDigestSender {
    async fn send_digest(&self, digest: &Digest) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(digest).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}
