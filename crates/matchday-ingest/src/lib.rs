//! Matchday Ingest Library
//!
//! Pulls reference data from a rate-limited sports data provider into a
//! [`Store`](storage::Store) and sends daily match digests.
//!
//! # Components
//!
//! - **governor**: process-wide throttle every provider call passes through
//! - **provider**: provider trait, HTTP client and the governed decorator
//! - **storage**: persistence contract and the in-memory store
//! - **jobs**: competitions → teams → squads ingestion jobs
//! - **orchestrator**: runs the jobs in dependency order
//! - **notifications**: per-user match day digests
//! - **schedule**: cron triggers and the two scheduled drivers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use matchday_ingest::{
//!     config::IngestConfig,
//!     governor::RequestGovernor,
//!     jobs::{default_jobs, JobContext},
//!     orchestrator::Orchestrator,
//!     provider::{GovernedProvider, HttpProvider},
//!     storage::MemoryStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let governor = RequestGovernor::new(config.governor.clone());
//!     let provider = GovernedProvider::new(HttpProvider::new(&config.provider)?, governor);
//!     let ctx = JobContext::new(Arc::new(provider), Arc::new(MemoryStore::new()), config.fan_out);
//!
//!     let orchestrator = Orchestrator::new(default_jobs(config.provider.plan.clone()), ctx)?;
//!     let report = orchestrator.run_once().await;
//!     println!("all jobs succeeded: {}", report.all_succeeded());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod governor;
pub mod jobs;
pub mod notifications;
pub mod orchestrator;
pub mod provider;
pub mod schedule;
pub mod storage;
