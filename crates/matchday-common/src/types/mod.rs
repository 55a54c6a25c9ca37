//! Common types used across Matchday
//!
//! Every entity is keyed by the provider's external numeric identifier so
//! that repeated ingestion runs upsert in place instead of duplicating rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::MatchdayError;

/// External identifier assigned by the data provider.
pub type ExternalId = i64;

// ============================================================================
// Reference Data
// ============================================================================

/// A competition (league or cup) offered by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competition {
    pub id: ExternalId,
    pub name: String,
    pub code: Option<String>,
    pub area: Option<String>,
    /// Data plan tier the provider serves this competition under
    pub plan: Option<String>,
}

/// A team. Teams can appear in several competitions at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: ExternalId,
    pub name: String,
    pub short_name: Option<String>,
    pub tla: Option<String>,
    pub venue: Option<String>,
    #[serde(default)]
    pub competition_ids: BTreeSet<ExternalId>,
}

impl Team {
    /// Merge competition membership from another snapshot of the same team.
    ///
    /// Scalar fields are taken from `other`; memberships are unioned.
    pub fn merged_with(&self, other: &Team) -> Team {
        let mut merged = other.clone();
        merged
            .competition_ids
            .extend(self.competition_ids.iter().copied());
        merged
    }
}

/// A player belonging to a team's squad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: ExternalId,
    pub team_id: ExternalId,
    pub name: String,
    pub position: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub shirt_number: Option<i32>,
}

/// A team's coach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coach {
    pub id: ExternalId,
    pub team_id: ExternalId,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
}

/// Role of a person listed in a squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SquadRole {
    Player,
    Coach,
}

/// One entry of a team's squad composition, before the full profile is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadMember {
    pub id: ExternalId,
    pub role: SquadRole,
}

/// Full profile of a person as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonProfile {
    pub id: ExternalId,
    pub name: String,
    pub position: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub shirt_number: Option<i32>,
}

impl PersonProfile {
    pub fn into_player(self, team_id: ExternalId) -> Player {
        Player {
            id: self.id,
            team_id,
            name: self.name,
            position: self.position,
            date_of_birth: self.date_of_birth,
            nationality: self.nationality,
            shirt_number: self.shirt_number,
        }
    }

    pub fn into_coach(self, team_id: ExternalId) -> Coach {
        Coach {
            id: self.id,
            team_id,
            name: self.name,
            date_of_birth: self.date_of_birth,
            nationality: self.nationality,
        }
    }
}

/// A scheduled or played match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: ExternalId,
    pub competition_id: ExternalId,
    /// Unknown until the fixture is decided (e.g. cup draws)
    pub home_team_id: Option<ExternalId>,
    pub away_team_id: Option<ExternalId>,
    pub utc_date: DateTime<Utc>,
    pub status: Option<String>,
}

// ============================================================================
// Users and Notifications
// ============================================================================

/// What a favorite (and a notification entry) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Team,
    Competition,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Team => "team",
            SubjectKind::Competition => "competition",
        }
    }
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubjectKind {
    type Err = MatchdayError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "team" | "teams" => Ok(SubjectKind::Team),
            "competition" | "competitions" => Ok(SubjectKind::Competition),
            other => Err(MatchdayError::UnknownSubjectKind(other.to_string())),
        }
    }
}

/// An application user together with their favorites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub favorite_teams: Vec<ExternalId>,
    #[serde(default)]
    pub favorite_competitions: Vec<ExternalId>,
}

impl User {
    /// All favorites as `(kind, subject_id)` pairs, teams first.
    pub fn favorites(&self) -> impl Iterator<Item = (SubjectKind, ExternalId)> + '_ {
        self.favorite_teams
            .iter()
            .map(|id| (SubjectKind::Team, *id))
            .chain(
                self.favorite_competitions
                    .iter()
                    .map(|id| (SubjectKind::Competition, *id)),
            )
    }
}

/// A match a user should hear about today. Built per notification run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationCandidate {
    pub user_id: Uuid,
    pub kind: SubjectKind,
    pub subject_id: ExternalId,
    pub match_id: ExternalId,
    pub match_date: NaiveDate,
}
