//! In-process store

use std::collections::BTreeMap;

use async_trait::async_trait;
use matchday_common::types::{Coach, Competition, ExternalId, Player, Team, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, UpsertOutcome};

#[derive(Debug, Default)]
struct Tables {
    competitions: BTreeMap<ExternalId, Competition>,
    teams: BTreeMap<ExternalId, Team>,
    players: BTreeMap<ExternalId, Player>,
    coaches: BTreeMap<ExternalId, Coach>,
    users: BTreeMap<Uuid, User>,
}

/// [`Store`] backed by ordered maps behind a single async lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn upsert<K: Ord, V: PartialEq>(
    table: &mut BTreeMap<K, V>,
    key: K,
    value: V,
) -> UpsertOutcome {
    match table.get_mut(&key) {
        Some(existing) if *existing == value => UpsertOutcome::Unchanged,
        Some(existing) => {
            *existing = value;
            UpsertOutcome::Updated
        },
        None => {
            table.insert(key, value);
            UpsertOutcome::Inserted
        },
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a user. Users are managed outside ingestion.
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_competition(
        &self,
        competition: Competition,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(upsert(&mut tables.competitions, competition.id, competition))
    }

    async fn upsert_team(&self, team: Team) -> Result<UpsertOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        let merged = match tables.teams.get(&team.id) {
            Some(existing) => existing.merged_with(&team),
            None => team,
        };
        Ok(upsert(&mut tables.teams, merged.id, merged))
    }

    async fn upsert_player(&self, player: Player) -> Result<UpsertOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(upsert(&mut tables.players, player.id, player))
    }

    async fn upsert_coach(&self, coach: Coach) -> Result<UpsertOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(upsert(&mut tables.coaches, coach.id, coach))
    }

    async fn find_competition_by_id(
        &self,
        id: ExternalId,
    ) -> Result<Option<Competition>, StoreError> {
        Ok(self.tables.read().await.competitions.get(&id).cloned())
    }

    async fn find_team_by_id(&self, id: ExternalId) -> Result<Option<Team>, StoreError> {
        Ok(self.tables.read().await.teams.get(&id).cloned())
    }

    async fn find_player_by_id(&self, id: ExternalId) -> Result<Option<Player>, StoreError> {
        Ok(self.tables.read().await.players.get(&id).cloned())
    }

    async fn find_coach_by_id(&self, id: ExternalId) -> Result<Option<Coach>, StoreError> {
        Ok(self.tables.read().await.coaches.get(&id).cloned())
    }

    async fn competitions(&self) -> Result<Vec<Competition>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .competitions
            .values()
            .cloned()
            .collect())
    }

    async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        Ok(self.tables.read().await.teams.values().cloned().collect())
    }

    async fn teams_for_competition(
        &self,
        competition_id: ExternalId,
    ) -> Result<Vec<Team>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .teams
            .values()
            .filter(|t| t.competition_ids.contains(&competition_id))
            .cloned()
            .collect())
    }

    async fn squad_for_team(
        &self,
        team_id: ExternalId,
    ) -> Result<(Vec<Player>, Option<Coach>), StoreError> {
        let tables = self.tables.read().await;
        let players = tables
            .players
            .values()
            .filter(|p| p.team_id == team_id)
            .cloned()
            .collect();
        let coach = tables
            .coaches
            .values()
            .find(|c| c.team_id == team_id)
            .cloned();
        Ok((players, coach))
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: ExternalId, competition_id: ExternalId) -> Team {
        Team {
            id,
            name: format!("Team {}", id),
            short_name: None,
            tla: None,
            venue: None,
            competition_ids: [competition_id].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn test_upsert_outcomes() {
        let store = MemoryStore::new();
        let competition = Competition {
            id: 2021,
            name: "Premier League".to_string(),
            code: Some("PL".to_string()),
            area: Some("England".to_string()),
            plan: Some("TIER_ONE".to_string()),
        };

        assert_eq!(
            store.upsert_competition(competition.clone()).await.unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.upsert_competition(competition.clone()).await.unwrap(),
            UpsertOutcome::Unchanged
        );

        let renamed = Competition {
            name: "EPL".to_string(),
            ..competition
        };
        assert_eq!(
            store.upsert_competition(renamed).await.unwrap(),
            UpsertOutcome::Updated
        );
        assert_eq!(store.competitions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_team_membership_is_merged() {
        let store = MemoryStore::new();
        store.upsert_team(team(57, 2021)).await.unwrap();
        let outcome = store.upsert_team(team(57, 2001)).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);

        assert_eq!(store.teams_for_competition(2021).await.unwrap().len(), 1);
        assert_eq!(store.teams_for_competition(2001).await.unwrap().len(), 1);

        // Re-listing under an already known competition changes nothing
        let outcome = store.upsert_team(team(57, 2021)).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_squad_for_team() {
        let store = MemoryStore::new();
        store
            .upsert_player(Player {
                id: 1,
                team_id: 57,
                name: "Bukayo Saka".to_string(),
                position: Some("Right Winger".to_string()),
                date_of_birth: None,
                nationality: Some("England".to_string()),
                shirt_number: Some(7),
            })
            .await
            .unwrap();
        store
            .upsert_coach(Coach {
                id: 2,
                team_id: 57,
                name: "Mikel Arteta".to_string(),
                date_of_birth: None,
                nationality: Some("Spain".to_string()),
            })
            .await
            .unwrap();

        let (players, coach) = store.squad_for_team(57).await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(coach.map(|c| c.id), Some(2));

        let (players, coach) = store.squad_for_team(65).await.unwrap();
        assert!(players.is_empty());
        assert!(coach.is_none());
    }
}
