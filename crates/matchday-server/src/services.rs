//! Process wiring for the ingestion side
//!
//! Builds one governor shared by every provider caller, the orchestrator
//! with the standard job chain, the notification job and the two scheduled
//! drivers.

use std::sync::Arc;

use anyhow::Context;
use matchday_ingest::{
    config::IngestConfig,
    governor::RequestGovernor,
    jobs::{default_jobs, JobContext},
    notifications::{DigestSender, LogDigestSender, NotificationJob, WebhookDigestSender},
    orchestrator::Orchestrator,
    provider::{GovernedProvider, HttpProvider, Provider},
    schedule::{IngestionTask, NotificationTask, Scheduler, Trigger},
    storage::Store,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct Services {
    pub governor: RequestGovernor,
    pub ingestion: IngestionTask,
    pub notifications: Arc<NotificationJob>,
}

impl Services {
    /// Wire services around the HTTP provider
    pub fn build(config: &IngestConfig, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        let http = HttpProvider::new(&config.provider).context("Failed to build provider client")?;
        Self::with_provider(config, http, store)
    }

    /// Wire services around any provider; calls are always governed
    pub fn with_provider<P: Provider + 'static>(
        config: &IngestConfig,
        provider: P,
        store: Arc<dyn Store>,
    ) -> anyhow::Result<Self> {
        let governor = RequestGovernor::new(config.governor.clone());
        let provider: Arc<dyn Provider> =
            Arc::new(GovernedProvider::new(provider, governor.clone()));

        let ctx = JobContext::new(provider.clone(), store.clone(), config.fan_out);
        let orchestrator = Orchestrator::new(default_jobs(config.provider.plan.clone()), ctx)?;
        info!(jobs = ?orchestrator.job_names(), "Ingestion jobs registered");

        let sender: Arc<dyn DigestSender> = match &config.notifications.webhook_url {
            Some(url) => Arc::new(WebhookDigestSender::new(url.clone(), config.provider.timeout())?),
            None => Arc::new(LogDigestSender),
        };
        let notifications = NotificationJob::new(
            provider,
            store,
            sender,
            &config.notifications,
            config.fan_out,
        )?;

        Ok(Self {
            governor,
            ingestion: IngestionTask::new(Arc::new(orchestrator)),
            notifications: Arc::new(notifications),
        })
    }

    /// Scheduler with both drivers on their configured cadences
    pub fn scheduler(&self, config: &IngestConfig, cancel: CancellationToken) -> anyhow::Result<Scheduler> {
        let ingest_trigger = Trigger::parse(&config.schedule.ingest_cron)?;
        let notify_trigger = Trigger::parse(&config.schedule.notify_cron)?;

        Ok(Scheduler::new(cancel)
            .add(ingest_trigger, Arc::new(self.ingestion.clone()))
            .add(
                notify_trigger,
                Arc::new(NotificationTask::new(self.notifications.clone())),
            ))
    }
}
