//! Error types for the Matchday client
//!
//! Every variant is user-facing. Cancellation is deliberately not an error:
//! a cancelled operation resolves to
//! [`PollOutcome::Cancelled`](crate::api::PollOutcome::Cancelled).
//!
//! ```
//! use matchday_client::api::PollOutcome;
//!
//! let outcome: PollOutcome<()> = PollOutcome::Cancelled;
//! assert!(outcome.is_cancelled());
//! assert_eq!(outcome.into_data(), None);
//! ```

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The server rejected the credentials; they have been cleared
    #[error("Not signed in or session expired. Sign in again to continue.")]
    Unauthorized,

    /// The server kept answering "processing" past the retry cap
    #[error("The server is still processing this request after {retries} retries, try again later.")]
    ProcessingTimeout { retries: u32 },

    /// 4xx response other than 401
    #[error("{message}")]
    Client { status: u16, message: String },

    /// 5xx (or otherwise unexpected) response
    #[error("{message}")]
    Server { status: u16, message: String },

    /// HTTP request failed before a response arrived
    #[error("Network request failed: {0}. Check your connection and server URL.")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables.")]
    Config(String),
}

impl ClientError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status behind this error, when there was a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
