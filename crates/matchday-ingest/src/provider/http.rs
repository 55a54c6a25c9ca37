//! HTTP client for the sports data provider

use async_trait::async_trait;
use chrono::NaiveDate;
use matchday_common::types::{
    Competition, ExternalId, Match, PersonProfile, SquadMember, SubjectKind, Team,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{CompetitionList, MatchList, PersonPayload, TeamDetail, TeamList};
use super::{Provider, ProviderError};
use crate::config::ProviderConfig;

const AUTH_HEADER: &str = "X-Auth-Token";

/// Provider client speaking the provider's REST API
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
    base_url: String,
    api_token: String,
}

impl HttpProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Provider request");

        let mut request = self.client.get(&url).query(query);
        if !self.api_token.is_empty() {
            request = request.header(AUTH_HEADER, &self.api_token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn competitions(&self) -> Result<Vec<Competition>, ProviderError> {
        let list: CompetitionList = self.get_json("/competitions", &[]).await?;
        Ok(list.competitions.into_iter().map(Into::into).collect())
    }

    async fn teams(&self, competition_id: ExternalId) -> Result<Vec<Team>, ProviderError> {
        let path = format!("/competitions/{}/teams", competition_id);
        let list: TeamList = self.get_json(&path, &[]).await?;
        Ok(list
            .teams
            .into_iter()
            .map(|t| t.into_team(competition_id))
            .collect())
    }

    async fn squad(&self, team_id: ExternalId) -> Result<Vec<SquadMember>, ProviderError> {
        let detail: TeamDetail = self.get_json(&format!("/teams/{}", team_id), &[]).await?;
        Ok(detail.into_members())
    }

    async fn person(&self, person_id: ExternalId) -> Result<PersonProfile, ProviderError> {
        let person: PersonPayload = self
            .get_json(&format!("/persons/{}", person_id), &[])
            .await?;
        Ok(person.into())
    }

    async fn matches(
        &self,
        kind: SubjectKind,
        subject_id: ExternalId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Match>, ProviderError> {
        let path = match kind {
            SubjectKind::Team => format!("/teams/{}/matches", subject_id),
            SubjectKind::Competition => format!("/competitions/{}/matches", subject_id),
        };
        let query = [
            ("dateFrom", from.format("%Y-%m-%d").to_string()),
            ("dateTo", to.format("%Y-%m-%d").to_string()),
        ];
        let list: MatchList = self.get_json(&path, &query).await?;
        Ok(list.matches.into_iter().map(Into::into).collect())
    }
}
