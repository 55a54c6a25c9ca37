//! Matchday Server Library
//!
//! Hosts the ingestion pipeline and exposes a small status/trigger API.
//!
//! - **API Endpoints**: governor status, latest ingestion run, run trigger
//! - **Scheduling**: weekly ingestion and daily notification drivers
//! - **Configuration**: environment-based configuration management
//! - **Middleware**: CORS and request logging
//!
//! Every endpoint follows the polling contract in [`api::response`]: a
//! resource that is still being produced answers `202 Accepted` with a
//! `Retry-After` header instead of blocking.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use matchday_ingest::storage::MemoryStore;
//! use matchday_server::{api, config::Config, services::Services};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let services = Services::build(&config.ingest, Arc::new(MemoryStore::new()))?;
//!     let state = api::AppState {
//!         governor: services.governor.clone(),
//!         ingestion: services.ingestion.clone(),
//!         admin_token: config.server.admin_token.clone(),
//!     };
//!     let app = api::create_router(state, &config.cors);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod middleware;
pub mod services;
