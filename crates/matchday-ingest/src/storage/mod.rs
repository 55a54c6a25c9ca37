//! Persistence contract for ingested entities
//!
//! Jobs depend only on the [`Store`] trait. Every upsert is keyed by the
//! provider's external id, so re-running a job updates rows in place.

pub mod memory;

use async_trait::async_trait;
use matchday_common::types::{Coach, Competition, ExternalId, Player, Team, User};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;

/// Errors raised by a storage backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// What an upsert did to the stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Storage used by the ingestion and notification jobs
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_competition(&self, competition: Competition)
        -> Result<UpsertOutcome, StoreError>;

    /// Upsert a team, merging its competition membership with what is stored
    async fn upsert_team(&self, team: Team) -> Result<UpsertOutcome, StoreError>;

    async fn upsert_player(&self, player: Player) -> Result<UpsertOutcome, StoreError>;

    async fn upsert_coach(&self, coach: Coach) -> Result<UpsertOutcome, StoreError>;

    async fn find_competition_by_id(
        &self,
        id: ExternalId,
    ) -> Result<Option<Competition>, StoreError>;

    async fn find_team_by_id(&self, id: ExternalId) -> Result<Option<Team>, StoreError>;

    async fn find_player_by_id(&self, id: ExternalId) -> Result<Option<Player>, StoreError>;

    async fn find_coach_by_id(&self, id: ExternalId) -> Result<Option<Coach>, StoreError>;

    async fn competitions(&self) -> Result<Vec<Competition>, StoreError>;

    async fn teams(&self) -> Result<Vec<Team>, StoreError>;

    async fn teams_for_competition(
        &self,
        competition_id: ExternalId,
    ) -> Result<Vec<Team>, StoreError>;

    /// Players and the coach currently attached to a team
    async fn squad_for_team(
        &self,
        team_id: ExternalId,
    ) -> Result<(Vec<Player>, Option<Coach>), StoreError>;

    /// All users together with their favorites
    async fn users(&self) -> Result<Vec<User>, StoreError>;
}
