use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use matchday_common::types::{ExternalId, PersonProfile, SquadRole};
use tracing::{debug, info};

use super::{IngestionJob, JobContext, JobError, JobStats};
use crate::provider::{Provider, ProviderError};

/// Refreshes players and coaches of every stored team
pub struct SquadsJob;

struct FetchedSquad {
    team_id: ExternalId,
    members: Vec<(SquadRole, PersonProfile)>,
}

impl FetchedSquad {
    /// One call for the squad plus one per member profile
    fn provider_calls(&self) -> u64 {
        1 + self.members.len() as u64
    }
}

async fn fetch_squad(
    provider: &dyn Provider,
    team_id: ExternalId,
) -> Result<FetchedSquad, ProviderError> {
    let composition = provider.squad(team_id).await?;
    debug!(team_id = team_id, members = composition.len(), "Squad listed");

    let mut members = Vec::with_capacity(composition.len());
    for member in composition {
        let profile = provider.person(member.id).await?;
        members.push((member.role, profile));
    }

    Ok(FetchedSquad { team_id, members })
}

#[async_trait]
impl IngestionJob for SquadsJob {
    fn name(&self) -> &'static str {
        "squads"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["teams"]
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobStats, JobError> {
        let mut stats = JobStats::new();
        let teams = ctx.store.teams().await?;

        let squads: Vec<FetchedSquad> = stream::iter(teams)
            .map(|team| {
                let provider = ctx.provider.clone();
                async move { fetch_squad(provider.as_ref(), team.id).await }
            })
            .buffer_unordered(ctx.fan_out)
            .try_collect()
            .await?;

        for squad in squads {
            stats.provider_calls += squad.provider_calls();
            for (role, profile) in squad.members {
                let id = profile.id;
                match role {
                    SquadRole::Player => {
                        let result = ctx
                            .store
                            .upsert_player(profile.into_player(squad.team_id))
                            .await;
                        stats.record_upsert(self.name(), "player", id, result);
                    },
                    SquadRole::Coach => {
                        let result = ctx
                            .store
                            .upsert_coach(profile.into_coach(squad.team_id))
                            .await;
                        stats.record_upsert(self.name(), "coach", id, result);
                    },
                }
            }
        }

        stats.complete();
        info!(
            people = stats.total(),
            provider_calls = stats.provider_calls,
            "Squads refreshed"
        );
        Ok(stats)
    }
}
