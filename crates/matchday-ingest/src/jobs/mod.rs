//! Ingestion jobs
//!
//! Each job refreshes one entity kind from the provider:
//!
//! - **competitions**: competitions served under the configured plan
//! - **teams**: teams of every stored competition (depends on competitions)
//! - **squads**: players and coaches of every stored team (depends on teams)
//!
//! Jobs are run by the [`Orchestrator`](crate::orchestrator::Orchestrator),
//! which honours the `depends_on` edges.

pub mod competitions;
pub mod squads;
pub mod teams;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::provider::{Provider, ProviderError};
use crate::storage::{Store, StoreError, UpsertOutcome};

pub use competitions::CompetitionsJob;
pub use squads::SquadsJob;
pub use teams::TeamsJob;

/// Errors that abort a job
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),
}

/// Everything a job needs to run
#[derive(Clone)]
pub struct JobContext {
    /// Governed provider shared by all jobs
    pub provider: Arc<dyn Provider>,
    pub store: Arc<dyn Store>,
    /// Maximum concurrent sub-resource fetches
    pub fan_out: usize,
}

impl JobContext {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn Store>, fan_out: usize) -> Self {
        Self {
            provider,
            store,
            fan_out: fan_out.max(1),
        }
    }
}

/// Statistics collected during one job run
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct JobStats {
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed: u64,
    pub provider_calls: u64,
    pub duration_secs: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStats {
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
        if let (Some(start), Some(end)) = (self.started_at, self.completed_at) {
            self.duration_secs = (end - start).num_milliseconds() as f64 / 1000.0;
        }
    }

    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Record a per-entity storage result; failures are logged and counted
    pub fn record_upsert(
        &mut self,
        job: &str,
        entity: &str,
        id: i64,
        result: Result<UpsertOutcome, StoreError>,
    ) {
        match result {
            Ok(outcome) => self.record(outcome),
            Err(e) => {
                warn!(job = job, entity = entity, id = id, error = %e, "Failed to store entity");
                self.failed += 1;
            },
        }
    }

    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.unchanged + self.failed
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs.max(0.0))
    }
}

/// A unit of ingestion work with named dependencies
#[async_trait]
pub trait IngestionJob: Send + Sync {
    fn name(&self) -> &'static str;

    /// Jobs that must succeed before this one starts
    fn depends_on(&self) -> &'static [&'static str];

    async fn run(&self, ctx: &JobContext) -> Result<JobStats, JobError>;
}

/// The standard competitions → teams → squads chain
pub fn default_jobs(plan: impl Into<String>) -> Vec<Arc<dyn IngestionJob>> {
    vec![
        Arc::new(CompetitionsJob::new(plan)),
        Arc::new(TeamsJob),
        Arc::new(SquadsJob),
    ]
}
