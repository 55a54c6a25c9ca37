use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::info;

use super::{IngestionJob, JobContext, JobError, JobStats};

/// Refreshes the teams of every stored competition
pub struct TeamsJob;

#[async_trait]
impl IngestionJob for TeamsJob {
    fn name(&self) -> &'static str {
        "teams"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["competitions"]
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobStats, JobError> {
        let mut stats = JobStats::new();
        let competitions = ctx.store.competitions().await?;

        let listings: Vec<_> = stream::iter(competitions)
            .map(|competition| {
                let provider = ctx.provider.clone();
                async move { provider.teams(competition.id).await }
            })
            .buffer_unordered(ctx.fan_out)
            .try_collect()
            .await?;
        stats.provider_calls += listings.len() as u64;

        for team in listings.into_iter().flatten() {
            let id = team.id;
            let result = ctx.store.upsert_team(team).await;
            stats.record_upsert(self.name(), "team", id, result);
        }

        stats.complete();
        info!(
            competitions = stats.provider_calls,
            teams = stats.total(),
            "Teams refreshed"
        );
        Ok(stats)
    }
}
