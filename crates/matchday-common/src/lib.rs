//! Matchday Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging bootstrap, and error handling for the Matchday workspace.
//!
//! # Overview
//!
//! - **Error Handling**: The shared error type and result alias
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` environment variables
//! - **Types**: Domain entities keyed by the provider's external identifiers
//!
//! # Example
//!
//! ```no_run
//! use matchday_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{MatchdayError, Result};
