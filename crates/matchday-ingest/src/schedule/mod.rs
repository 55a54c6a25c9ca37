//! Calendar scheduling
//!
//! A [`Scheduler`] owns any number of `(Trigger, ScheduledTask)` pairs and
//! runs each pair in its own tokio task. Pairs never wait on each other, so
//! the ingestion and notification drivers may overlap; runs of the same task
//! are sequential. Cancelling the scheduler's token wakes every pending wait
//! and stops in-progress runs at their next await point.

pub mod tasks;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use tasks::{IngestionTask, NotificationTask, RunStatus, RunTracker};

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {message}")]
    InvalidCron { expression: String, message: String },
}

/// Work fired by a [`Trigger`]
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self);
}

/// Cron-based fire times
#[derive(Debug, Clone)]
pub struct Trigger {
    expression: String,
    schedule: Schedule,
}

impl Trigger {
    /// Parse a cron expression.
    ///
    /// Five-field expressions (`min hour dom month dow`) get a leading
    /// seconds field of `0`.
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let fields = expression.split_whitespace().count();
        let normalized = if fields == 5 {
            format!("0 {}", expression)
        } else {
            expression.to_string()
        };

        let schedule =
            Schedule::from_str(&normalized).map_err(|e| ScheduleError::InvalidCron {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

pub struct Scheduler {
    entries: Vec<(Trigger, Arc<dyn ScheduledTask>)>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            entries: Vec::new(),
            cancel,
        }
    }

    pub fn add(mut self, trigger: Trigger, task: Arc<dyn ScheduledTask>) -> Self {
        self.entries.push((trigger, task));
        self
    }

    /// Spawn one loop per registered task
    pub fn start(self) -> Vec<JoinHandle<()>> {
        let Scheduler { entries, cancel } = self;
        entries
            .into_iter()
            .map(|(trigger, task)| tokio::spawn(run_loop(trigger, task, cancel.clone())))
            .collect()
    }
}

async fn run_loop(trigger: Trigger, task: Arc<dyn ScheduledTask>, cancel: CancellationToken) {
    info!(task = task.name(), cron = trigger.expression(), "Scheduled task registered");

    loop {
        let now = Utc::now();
        let Some(next) = trigger.next_after(now) else {
            warn!(task = task.name(), "Trigger has no upcoming fire time, stopping");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        info!(task = task.name(), next_run = %next, "Next run scheduled");

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {},
        }

        info!(task = task.name(), "Scheduled run starting");
        tokio::select! {
            _ = cancel.cancelled() => {
                warn!(task = task.name(), "Scheduled run interrupted by shutdown");
                break;
            },
            _ = task.run() => {},
        }
    }

    info!(task = task.name(), "Scheduled task stopped");
}
