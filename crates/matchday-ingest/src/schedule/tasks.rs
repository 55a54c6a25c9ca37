//! The two scheduled drivers

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};

use super::ScheduledTask;
use crate::notifications::NotificationJob;
use crate::orchestrator::{Orchestrator, RunReport};

/// What the ingestion driver is doing right now
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Nothing has run since startup
    Idle,
    InFlight,
    Finished(RunReport),
}

#[derive(Debug, Default)]
struct TrackerState {
    in_flight: bool,
    last: Option<RunReport>,
}

/// Tracks the in-flight flag and the last finished ingestion run
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    state: Arc<Mutex<TrackerState>>,
}

/// Clears the in-flight flag when the run ends, even if it is dropped midway
struct InFlight {
    tracker: RunTracker,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.tracker.lock().in_flight = false;
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_begin(&self) -> Option<InFlight> {
        let mut state = self.lock();
        if state.in_flight {
            return None;
        }
        state.in_flight = true;
        Some(InFlight {
            tracker: self.clone(),
        })
    }

    fn finish(&self, report: RunReport) {
        self.lock().last = Some(report);
    }

    pub fn status(&self) -> RunStatus {
        let state = self.lock();
        match (&state.last, state.in_flight) {
            (_, true) => RunStatus::InFlight,
            (Some(report), false) => RunStatus::Finished(report.clone()),
            (None, false) => RunStatus::Idle,
        }
    }

    pub fn last_report(&self) -> Option<RunReport> {
        self.lock().last.clone()
    }
}

/// Runs the orchestrator, at most one run at a time
#[derive(Clone)]
pub struct IngestionTask {
    orchestrator: Arc<Orchestrator>,
    tracker: RunTracker,
}

impl IngestionTask {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            tracker: RunTracker::new(),
        }
    }

    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    /// Run now and wait. Returns `None` when a run is already in flight.
    pub async fn run_tracked(&self) -> Option<RunReport> {
        let Some(_in_flight) = self.tracker.try_begin() else {
            info!("Ingestion run already in flight, not starting another");
            return None;
        };

        let report = self.orchestrator.run_once().await;
        self.tracker.finish(report.clone());
        Some(report)
    }

    /// Start a run in the background. Returns `false` when one is already in flight.
    pub fn trigger(&self) -> bool {
        let Some(in_flight) = self.tracker.try_begin() else {
            return false;
        };

        let orchestrator = self.orchestrator.clone();
        let tracker = self.tracker.clone();
        tokio::spawn(async move {
            let _in_flight = in_flight;
            let report = orchestrator.run_once().await;
            tracker.finish(report);
        });
        true
    }
}

#[async_trait]
impl ScheduledTask for IngestionTask {
    fn name(&self) -> &str {
        "ingestion"
    }

    async fn run(&self) {
        self.run_tracked().await;
    }
}

/// Runs the notification job against the current clock
pub struct NotificationTask {
    job: Arc<NotificationJob>,
}

impl NotificationTask {
    pub fn new(job: Arc<NotificationJob>) -> Self {
        Self { job }
    }
}

#[async_trait]
impl ScheduledTask for NotificationTask {
    fn name(&self) -> &str {
        "notifications"
    }

    async fn run(&self) {
        if let Err(e) = self.job.run_at(Utc::now()).await {
            error!(error = %e, "Notification run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationConfig;
    use crate::jobs::{IngestionJob, JobContext, JobError, JobStats};
    use crate::notifications::{Digest, DigestSender, NotifyError};
    use crate::provider::{Provider, ProviderError};
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;
    use matchday_common::types::{
        Competition, ExternalId, Match, PersonProfile, SquadMember, SubjectKind, Team, User,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use uuid::Uuid;

    /// No competitions; every favorite has one match right now
    struct Stub;

    #[async_trait]
    impl Provider for Stub {
        async fn competitions(&self) -> Result<Vec<Competition>, ProviderError> {
            Ok(vec![])
        }
        async fn teams(&self, _: ExternalId) -> Result<Vec<Team>, ProviderError> {
            Ok(vec![])
        }
        async fn squad(&self, _: ExternalId) -> Result<Vec<SquadMember>, ProviderError> {
            Ok(vec![])
        }
        async fn person(&self, _: ExternalId) -> Result<PersonProfile, ProviderError> {
            unreachable!("no squads are listed")
        }
        async fn matches(
            &self,
            _: SubjectKind,
            subject_id: ExternalId,
            _: NaiveDate,
            _: NaiveDate,
        ) -> Result<Vec<Match>, ProviderError> {
            Ok(vec![Match {
                id: 1000 + subject_id,
                competition_id: 2021,
                home_team_id: Some(subject_id),
                away_team_id: Some(61),
                utc_date: Utc::now(),
                status: Some("SCHEDULED".to_string()),
            }])
        }
    }

    /// Blocks until released
    struct Gate(Arc<Notify>);

    #[async_trait]
    impl IngestionJob for Gate {
        fn name(&self) -> &'static str {
            "gate"
        }

        fn depends_on(&self) -> &'static [&'static str] {
            &[]
        }

        async fn run(&self, _ctx: &JobContext) -> Result<JobStats, JobError> {
            self.0.notified().await;
            Ok(JobStats::new())
        }
    }

    #[tokio::test]
    async fn test_trigger_tracks_in_flight_run() {
        let gate = Arc::new(Notify::new());
        let ctx = JobContext::new(Arc::new(Stub), Arc::new(MemoryStore::new()), 1);
        let orchestrator =
            Orchestrator::new(vec![Arc::new(Gate(gate.clone()))], ctx).unwrap();
        let task = IngestionTask::new(Arc::new(orchestrator));

        assert_eq!(task.tracker().status(), RunStatus::Idle);
        assert!(task.trigger());
        assert_eq!(task.tracker().status(), RunStatus::InFlight);
        assert!(!task.trigger(), "second trigger must not start a run");
        assert!(task.run_tracked().await.is_none());

        gate.notify_one();
        for _ in 0..100 {
            if matches!(task.tracker().status(), RunStatus::Finished(_)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        match task.tracker().status() {
            RunStatus::Finished(report) => assert!(report.all_succeeded()),
            other => panic!("expected a finished run, got {:?}", other),
        }
    }

    #[derive(Default)]
    struct CountingSender(AtomicUsize);

    #[async_trait]
    impl DigestSender for CountingSender {
        async fn send_digest(&self, _digest: &Digest) -> Result<(), NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn channel_name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_notification_task_runs_on_spawned_scheduler_task() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(User {
                id: Uuid::new_v4(),
                email: "fan@example.com".to_string(),
                display_name: "Fan".to_string(),
                favorite_teams: vec![57],
                favorite_competitions: vec![],
            })
            .await;
        let sender = Arc::new(CountingSender::default());
        let config = NotificationConfig {
            lookahead_days: 7,
            reference_utc_offset: "+00:00".to_string(),
            webhook_url: None,
        };
        let job = NotificationJob::new(Arc::new(Stub), store, sender.clone(), &config, 2).unwrap();

        let task: Arc<dyn ScheduledTask> = Arc::new(NotificationTask::new(Arc::new(job)));
        assert_eq!(task.name(), "notifications");
        tokio::spawn(async move { task.run().await }).await.unwrap();

        assert_eq!(sender.0.load(Ordering::SeqCst), 1);
    }
}
