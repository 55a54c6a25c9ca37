//! API client module
//!
//! Polling HTTP client for the Matchday server.

pub mod client;
pub mod endpoints;
pub mod protocol;

pub use client::PollingClient;
pub use protocol::{NoopObserver, PollEvent, PollObserver, PollOutcome, RequestSpec};
