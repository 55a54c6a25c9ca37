//! Provider wire payloads
//!
//! Only the fields Matchday stores are modelled; everything else in the
//! provider's responses is ignored.

use chrono::{DateTime, NaiveDate, Utc};
use matchday_common::types::{
    Competition, ExternalId, Match, PersonProfile, SquadMember, SquadRole, Team,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CompetitionList {
    #[serde(default)]
    pub competitions: Vec<CompetitionPayload>,
}

#[derive(Debug, Deserialize)]
pub struct CompetitionPayload {
    pub id: ExternalId,
    pub name: String,
    pub code: Option<String>,
    pub plan: Option<String>,
    pub area: Option<AreaPayload>,
}

#[derive(Debug, Deserialize)]
pub struct AreaPayload {
    pub name: Option<String>,
}

impl From<CompetitionPayload> for Competition {
    fn from(p: CompetitionPayload) -> Self {
        Competition {
            id: p.id,
            name: p.name,
            code: p.code,
            area: p.area.and_then(|a| a.name),
            plan: p.plan,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TeamList {
    #[serde(default)]
    pub teams: Vec<TeamPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPayload {
    pub id: ExternalId,
    pub name: String,
    pub short_name: Option<String>,
    pub tla: Option<String>,
    pub venue: Option<String>,
}

impl TeamPayload {
    /// Convert, recording the competition the team was listed under
    pub fn into_team(self, competition_id: ExternalId) -> Team {
        Team {
            id: self.id,
            name: self.name,
            short_name: self.short_name,
            tla: self.tla,
            venue: self.venue,
            competition_ids: [competition_id].into_iter().collect(),
        }
    }
}

/// `GET /teams/{id}`: the team with its squad and coach
#[derive(Debug, Deserialize)]
pub struct TeamDetail {
    #[serde(default)]
    pub squad: Vec<PersonRef>,
    pub coach: Option<PersonRef>,
}

#[derive(Debug, Deserialize)]
pub struct PersonRef {
    /// Vacant coach positions come back with a null id
    pub id: Option<ExternalId>,
}

impl TeamDetail {
    pub fn into_members(self) -> Vec<SquadMember> {
        let players = self.squad.into_iter().filter_map(|p| {
            p.id.map(|id| SquadMember {
                id,
                role: SquadRole::Player,
            })
        });
        let coach = self.coach.and_then(|c| c.id).map(|id| SquadMember {
            id,
            role: SquadRole::Coach,
        });
        players.chain(coach).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPayload {
    pub id: ExternalId,
    pub name: String,
    pub position: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub shirt_number: Option<i32>,
}

impl From<PersonPayload> for PersonProfile {
    fn from(p: PersonPayload) -> Self {
        PersonProfile {
            id: p.id,
            name: p.name,
            position: p.position,
            date_of_birth: p.date_of_birth,
            nationality: p.nationality,
            shirt_number: p.shirt_number,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MatchList {
    #[serde(default)]
    pub matches: Vec<MatchPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPayload {
    pub id: ExternalId,
    pub utc_date: DateTime<Utc>,
    pub status: Option<String>,
    pub competition: IdRef,
    pub home_team: Option<OptionalIdRef>,
    pub away_team: Option<OptionalIdRef>,
}

#[derive(Debug, Deserialize)]
pub struct IdRef {
    pub id: ExternalId,
}

#[derive(Debug, Deserialize)]
pub struct OptionalIdRef {
    pub id: Option<ExternalId>,
}

impl From<MatchPayload> for Match {
    fn from(p: MatchPayload) -> Self {
        Match {
            id: p.id,
            competition_id: p.competition.id,
            home_team_id: p.home_team.and_then(|t| t.id),
            away_team_id: p.away_team.and_then(|t| t.id),
            utc_date: p.utc_date,
            status: p.status,
        }
    }
}
