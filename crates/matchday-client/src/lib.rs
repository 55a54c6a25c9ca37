//! Matchday Client Library
//!
//! Client for the Matchday server's "retry-later" protocol.
//!
//! # Overview
//!
//! The server answers long-running requests with `202 Accepted` and a
//! `Retry-After` hint. This crate hides that behind a single call:
//!
//! - **Polling**: [`PollingClient::execute`] re-issues a request until it
//!   settles, with a retry cap and cancellation
//! - **Queries**: [`QueryHandle`] re-runs a GET when its target changes and
//!   publishes `QueryState` on a watch channel
//! - **Mutations**: [`MutationHandle`] for POST/PUT/DELETE
//! - **Optimistic updates**: [`Optimistic`] and [`Favorites`]
//! - **Sessions**: a rejected token is cleared and
//!   [`SessionEvent::SignInRequired`] is broadcast
//!
//! # Example
//!
//! ```no_run
//! use matchday_client::{NoopObserver, PollOutcome, PollingClient, RequestSpec};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> matchday_client::Result<()> {
//! let client = PollingClient::from_env()?;
//! let spec = RequestSpec::get("/api/v1/ingest/runs/latest");
//! let outcome: PollOutcome<serde_json::Value> = client
//!     .execute(&spec, &CancellationToken::new(), &NoopObserver)
//!     .await?;
//! println!("{:?}", outcome.into_data());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mutation;
pub mod optimistic;
pub mod query;

// Re-export commonly used types
pub use api::{NoopObserver, PollEvent, PollObserver, PollOutcome, PollingClient, RequestSpec};
pub use config::ClientConfig;
pub use credentials::{CredentialStore, SessionEvent, SessionSignal};
pub use error::{ClientError, Result};
pub use mutation::MutationHandle;
pub use optimistic::{FavoriteSet, Favorites, Optimistic};
pub use query::{QueryHandle, QueryOptions, QueryState};

use clap::{Parser, Subcommand};

/// Matchday - command-line access to the Matchday server
#[derive(Parser, Debug)]
#[command(name = "matchday")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL
    #[arg(
        long,
        env = "MATCHDAY_SERVER_URL",
        default_value = config::DEFAULT_SERVER_URL,
        global = true
    )]
    pub server_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "MATCHDAY_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Processing responses tolerated before giving up
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// GET a path and print the JSON result
    Get {
        /// Path relative to the server URL
        path: String,
    },

    /// POST to a path with an optional JSON body
    Post {
        /// Path relative to the server URL
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },

    /// DELETE a path
    Delete {
        /// Path relative to the server URL
        path: String,
    },
}

impl Commands {
    /// Request described by this command
    pub fn request_spec(&self) -> Result<RequestSpec> {
        let spec = match self {
            Commands::Get { path } => RequestSpec::get(path.as_str()),
            Commands::Post { path, data } => {
                let body = data.as_deref().map(serde_json::from_str).transpose()?;
                RequestSpec::post(path.as_str(), body)
            },
            Commands::Delete { path } => RequestSpec::delete(path.as_str()),
        };
        Ok(spec.authenticated(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    #[test]
    fn test_cli_parses_post_with_body() {
        let cli = Cli::parse_from([
            "matchday",
            "--server-url",
            "http://server.test",
            "post",
            "/api/v1/ingest/runs",
            "--data",
            r#"{"force":true}"#,
        ]);
        assert_eq!(cli.server_url, "http://server.test");

        let spec = cli.command.request_spec().unwrap();
        assert_eq!(spec.method, Method::POST);
        assert_eq!(spec.body, Some(serde_json::json!({"force": true})));
        assert!(spec.authenticated);
    }

    #[test]
    fn test_invalid_body_is_rejected() {
        let command = Commands::Post {
            path: "/x".to_string(),
            data: Some("{not json".to_string()),
        };
        assert!(matches!(command.request_spec(), Err(ClientError::Decode(_))));
    }
}
