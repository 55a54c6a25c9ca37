//! Ingestion orchestrator
//!
//! Runs a fixed set of [`IngestionJob`]s once per invocation. All jobs are
//! spawned together; each waits on its dependencies' completion signals and
//! only starts once all of them succeeded. A job whose dependency failed or
//! was skipped is itself skipped for the run. The next scheduled run starts
//! again from the top.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::jobs::{IngestionJob, JobContext, JobStats};

/// Invalid job graph
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Job '{0}' is registered more than once")]
    DuplicateJob(String),

    #[error("Job '{job}' depends on unknown job '{dependency}'")]
    UnknownDependency { job: String, dependency: String },

    #[error("Job dependencies form a cycle through '{0}'")]
    Cycle(String),
}

/// Result of one job within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    Succeeded { stats: JobStats },
    Failed { error: String },
    Skipped { reason: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub name: String,
    pub outcome: JobOutcome,
}

/// Summary of one orchestrator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// In registration order
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    pub fn outcome(&self, job: &str) -> Option<&JobOutcome> {
        self.jobs.iter().find(|r| r.name == job).map(|r| &r.outcome)
    }

    pub fn all_succeeded(&self) -> bool {
        self.jobs.iter().all(|r| r.outcome.is_success())
    }
}

/// Completion signal broadcast by each job to its dependents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    Pending,
    Succeeded,
    NotSucceeded,
}

pub struct Orchestrator {
    jobs: Vec<Arc<dyn IngestionJob>>,
    ctx: JobContext,
}

impl Orchestrator {
    /// Validate the job graph and build an orchestrator
    pub fn new(
        jobs: Vec<Arc<dyn IngestionJob>>,
        ctx: JobContext,
    ) -> Result<Self, OrchestratorError> {
        validate_graph(&jobs)?;
        Ok(Self { jobs, ctx })
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.name()).collect()
    }

    /// Run every job once, honouring dependencies
    pub async fn run_once(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(run_id = %run_id, jobs = self.jobs.len(), "Ingestion run started");

        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for job in &self.jobs {
            let (tx, rx) = watch::channel(Completion::Pending);
            senders.insert(job.name(), tx);
            receivers.insert(job.name(), rx);
        }

        let mut handles = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            let deps: Vec<_> = job
                .depends_on()
                .iter()
                .filter_map(|d| receivers.get(d).map(|rx| (*d, rx.clone())))
                .collect();
            let done = senders.remove(job.name());
            let job = job.clone();
            let ctx = self.ctx.clone();

            handles.push((
                job.name(),
                tokio::spawn(async move {
                    let outcome = run_job(job.as_ref(), deps, &ctx).await;
                    if let Some(done) = done {
                        let signal = if outcome.is_success() {
                            Completion::Succeeded
                        } else {
                            Completion::NotSucceeded
                        };
                        let _ = done.send(signal);
                    }
                    outcome
                }),
            ));
        }
        drop(receivers);

        let mut jobs = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(job = name, error = %e, "Job task aborted");
                    JobOutcome::Failed {
                        error: format!("job task aborted: {}", e),
                    }
                },
            };
            jobs.push(JobReport {
                name: name.to_string(),
                outcome,
            });
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            jobs,
        };
        info!(
            run_id = %run_id,
            all_succeeded = report.all_succeeded(),
            "Ingestion run finished"
        );
        report
    }
}

async fn run_job(
    job: &dyn IngestionJob,
    deps: Vec<(&'static str, watch::Receiver<Completion>)>,
    ctx: &JobContext,
) -> JobOutcome {
    for (dep, mut rx) in deps {
        // A closed channel means the dependency's task died before signalling.
        let completion = match rx.wait_for(|c| *c != Completion::Pending).await {
            Ok(c) => *c,
            Err(_) => Completion::NotSucceeded,
        };
        if completion != Completion::Succeeded {
            warn!(job = job.name(), dependency = dep, "Skipping job, dependency did not succeed");
            return JobOutcome::Skipped {
                reason: format!("dependency '{}' did not succeed", dep),
            };
        }
    }

    info!(job = job.name(), "Job started");
    match job.run(ctx).await {
        Ok(stats) => {
            info!(
                job = job.name(),
                inserted = stats.inserted,
                updated = stats.updated,
                unchanged = stats.unchanged,
                failed = stats.failed,
                provider_calls = stats.provider_calls,
                duration_secs = stats.duration_secs,
                "Job succeeded"
            );
            JobOutcome::Succeeded { stats }
        },
        Err(e) => {
            error!(job = job.name(), error = %e, "Job failed");
            JobOutcome::Failed {
                error: e.to_string(),
            }
        },
    }
}

fn validate_graph(jobs: &[Arc<dyn IngestionJob>]) -> Result<(), OrchestratorError> {
    let mut names = HashSet::new();
    for job in jobs {
        if !names.insert(job.name()) {
            return Err(OrchestratorError::DuplicateJob(job.name().to_string()));
        }
    }

    for job in jobs {
        for dep in job.depends_on() {
            if !names.contains(dep) {
                return Err(OrchestratorError::UnknownDependency {
                    job: job.name().to_string(),
                    dependency: dep.to_string(),
                });
            }
        }
    }

    // Kahn's algorithm: whatever cannot be ordered sits on a cycle.
    let mut pending: HashMap<&'static str, usize> = jobs
        .iter()
        .map(|j| {
            let distinct: HashSet<_> = j.depends_on().iter().collect();
            (j.name(), distinct.len())
        })
        .collect();
    let mut ready: Vec<&'static str> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(name, _)| *name)
        .collect();

    while let Some(done) = ready.pop() {
        pending.remove(done);
        for job in jobs {
            if job.depends_on().contains(&done) {
                if let Some(n) = pending.get_mut(job.name()) {
                    *n -= 1;
                    if *n == 0 {
                        ready.push(job.name());
                    }
                }
            }
        }
    }

    match jobs.iter().find(|j| pending.contains_key(j.name())) {
        Some(job) => Err(OrchestratorError::Cycle(job.name().to_string())),
        None => Ok(()),
    }
}
