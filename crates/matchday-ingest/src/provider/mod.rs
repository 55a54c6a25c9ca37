//! Sports data provider
//!
//! - **http**: reqwest client for the provider's REST API
//! - **types**: wire payloads and their conversion into domain types
//!
//! Jobs never talk to [`HttpProvider`] directly. They receive a
//! [`GovernedProvider`] so every call passes through the shared
//! [`RequestGovernor`](crate::governor::RequestGovernor).

pub mod http;
pub mod types;

use async_trait::async_trait;
use chrono::NaiveDate;
use matchday_common::types::{
    Competition, ExternalId, Match, PersonProfile, SquadMember, SubjectKind, Team,
};
use thiserror::Error;

use crate::governor::RequestGovernor;

pub use http::HttpProvider;

/// Errors raised by provider calls
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status} for {path}")]
    Status { status: u16, path: String },

    #[error("Provider payload could not be decoded for {path}: {message}")]
    Decode { path: String, message: String },
}

/// Read access to the third-party sports data provider.
///
/// Every method maps to exactly one outbound request.
#[async_trait]
pub trait Provider: Send + Sync {
    /// All competitions visible to the account, regardless of plan
    async fn competitions(&self) -> Result<Vec<Competition>, ProviderError>;

    /// Teams taking part in a competition
    async fn teams(&self, competition_id: ExternalId) -> Result<Vec<Team>, ProviderError>;

    /// Squad composition (players and coach) of a team
    async fn squad(&self, team_id: ExternalId) -> Result<Vec<SquadMember>, ProviderError>;

    /// Full profile of a single person
    async fn person(&self, person_id: ExternalId) -> Result<PersonProfile, ProviderError>;

    /// Matches of a team or competition between two dates, both inclusive
    async fn matches(
        &self,
        kind: SubjectKind,
        subject_id: ExternalId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Match>, ProviderError>;
}

/// Routes every call of the wrapped provider through the request governor.
pub struct GovernedProvider<P> {
    inner: P,
    governor: RequestGovernor,
}

impl<P: Provider> GovernedProvider<P> {
    pub fn new(inner: P, governor: RequestGovernor) -> Self {
        Self { inner, governor }
    }

    pub fn governor(&self) -> &RequestGovernor {
        &self.governor
    }
}

#[async_trait]
impl<P: Provider> Provider for GovernedProvider<P> {
    async fn competitions(&self) -> Result<Vec<Competition>, ProviderError> {
        self.governor.run(self.inner.competitions()).await
    }

    async fn teams(&self, competition_id: ExternalId) -> Result<Vec<Team>, ProviderError> {
        self.governor.run(self.inner.teams(competition_id)).await
    }

    async fn squad(&self, team_id: ExternalId) -> Result<Vec<SquadMember>, ProviderError> {
        self.governor.run(self.inner.squad(team_id)).await
    }

    async fn person(&self, person_id: ExternalId) -> Result<PersonProfile, ProviderError> {
        self.governor.run(self.inner.person(person_id)).await
    }

    async fn matches(
        &self,
        kind: SubjectKind,
        subject_id: ExternalId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Match>, ProviderError> {
        self.governor
            .run(self.inner.matches(kind, subject_id, from, to))
            .await
    }
}
