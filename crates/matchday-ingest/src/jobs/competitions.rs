use async_trait::async_trait;
use tracing::info;

use super::{IngestionJob, JobContext, JobError, JobStats};

/// Refreshes competitions served under one data plan
pub struct CompetitionsJob {
    plan: String,
}

impl CompetitionsJob {
    pub fn new(plan: impl Into<String>) -> Self {
        Self { plan: plan.into() }
    }
}

#[async_trait]
impl IngestionJob for CompetitionsJob {
    fn name(&self) -> &'static str {
        "competitions"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobStats, JobError> {
        let mut stats = JobStats::new();

        let competitions = ctx.provider.competitions().await?;
        stats.provider_calls += 1;

        let listed = competitions.len();
        for competition in competitions
            .into_iter()
            .filter(|c| c.plan.as_deref() == Some(self.plan.as_str()))
        {
            let id = competition.id;
            let result = ctx.store.upsert_competition(competition).await;
            stats.record_upsert(self.name(), "competition", id, result);
        }

        stats.complete();
        info!(
            listed = listed,
            kept = stats.total(),
            plan = %self.plan,
            "Competitions refreshed"
        );
        Ok(stats)
    }
}
