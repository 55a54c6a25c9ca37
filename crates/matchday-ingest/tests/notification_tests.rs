//! Notification job tests
//!
//! Drive `NotificationJob::run_at` with a fixed clock, a scripted provider
//! and a recording digest sender.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use matchday_common::types::{
    Competition, ExternalId, Match, PersonProfile, SquadMember, SubjectKind, Team, User,
};
use matchday_ingest::config::{GovernorConfig, NotificationConfig};
use matchday_ingest::governor::RequestGovernor;
use matchday_ingest::notifications::{Digest, DigestSender, NotificationJob, NotifyError};
use matchday_ingest::provider::{GovernedProvider, Provider, ProviderError};
use matchday_ingest::storage::MemoryStore;
use uuid::Uuid;

#[derive(Default)]
struct ScriptedProvider {
    fixtures: HashMap<(SubjectKind, ExternalId), Vec<Match>>,
    failing: Vec<(SubjectKind, ExternalId)>,
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn competitions(&self) -> Result<Vec<Competition>, ProviderError> {
        Ok(vec![])
    }

    async fn teams(&self, _: ExternalId) -> Result<Vec<Team>, ProviderError> {
        Ok(vec![])
    }

    async fn squad(&self, _: ExternalId) -> Result<Vec<SquadMember>, ProviderError> {
        Ok(vec![])
    }

    async fn person(&self, id: ExternalId) -> Result<PersonProfile, ProviderError> {
        Err(ProviderError::Status {
            status: 404,
            path: format!("/persons/{}", id),
        })
    }

    async fn matches(
        &self,
        kind: SubjectKind,
        subject_id: ExternalId,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<Match>, ProviderError> {
        if self.failing.contains(&(kind, subject_id)) {
            return Err(ProviderError::Status {
                status: 500,
                path: format!("/{}s/{}/matches", kind, subject_id),
            });
        }
        Ok(self
            .fixtures
            .get(&(kind, subject_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<Digest>>,
    fail_for: Option<String>,
}

#[async_trait]
impl DigestSender for RecordingSender {
    async fn send_digest(&self, digest: &Digest) -> Result<(), NotifyError> {
        if self.fail_for.as_deref() == Some(digest.email.as_str()) {
            return Err(NotifyError::Status { status: 502 });
        }
        self.sent.lock().unwrap().push(digest.clone());
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recording"
    }
}

fn fixture(id: ExternalId, competition_id: ExternalId, utc_date: DateTime<Utc>) -> Match {
    Match {
        id,
        competition_id,
        home_team_id: Some(57),
        away_team_id: Some(61),
        utc_date,
        status: Some("TIMED".to_string()),
    }
}

fn user(email: &str, teams: Vec<ExternalId>, competitions: Vec<ExternalId>) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        display_name: email.split('@').next().unwrap_or_default().to_string(),
        favorite_teams: teams,
        favorite_competitions: competitions,
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 7, 0, 0).unwrap()
}

fn config(offset: &str) -> NotificationConfig {
    NotificationConfig {
        lookahead_days: 7,
        reference_utc_offset: offset.to_string(),
        webhook_url: None,
    }
}

async fn job_with(
    provider: ScriptedProvider,
    users: Vec<User>,
    sender: Arc<RecordingSender>,
    offset: &str,
) -> NotificationJob {
    let store = Arc::new(MemoryStore::new());
    for u in users {
        store.insert_user(u).await;
    }
    NotificationJob::new(Arc::new(provider), store, sender, &config(offset), 2).unwrap()
}

#[tokio::test]
async fn test_one_digest_with_only_todays_team_match() {
    let mut provider = ScriptedProvider::default();
    provider.fixtures.insert(
        (SubjectKind::Team, 57),
        vec![
            fixture(100, 2021, Utc.with_ymd_and_hms(2026, 10, 16, 19, 0, 0).unwrap()),
            fixture(101, 2021, Utc.with_ymd_and_hms(2026, 10, 19, 19, 0, 0).unwrap()),
        ],
    );
    provider.fixtures.insert(
        (SubjectKind::Competition, 2001),
        vec![fixture(
            200,
            2001,
            Utc.with_ymd_and_hms(2026, 10, 21, 19, 0, 0).unwrap(),
        )],
    );

    let fan = user("fan@example.com", vec![57], vec![2001]);
    let idle = user("idle@example.com", vec![99], vec![]);
    let sender = Arc::new(RecordingSender::default());
    let job = job_with(provider, vec![fan.clone(), idle], sender.clone(), "+00:00").await;

    let report = job.run_at(now()).await.unwrap();
    assert_eq!(report.users_checked, 2);
    assert_eq!(report.digests_sent, 1);

    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].email, "fan@example.com");
    assert_eq!(sent[0].user_id, fan.id);
    assert_eq!(sent[0].matches.len(), 1);
    assert_eq!(sent[0].matches[0].id, 100);
    assert_eq!(sent[0].candidates[0].kind, SubjectKind::Team);
    assert_eq!(
        sent[0].candidates[0].match_date,
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    );
}

#[tokio::test]
async fn test_reference_offset_decides_today() {
    // 23:30 UTC on the 16th is already the 17th at +02:00
    let mut provider = ScriptedProvider::default();
    provider.fixtures.insert(
        (SubjectKind::Team, 57),
        vec![fixture(
            300,
            2021,
            Utc.with_ymd_and_hms(2026, 10, 16, 23, 30, 0).unwrap(),
        )],
    );

    let sender = Arc::new(RecordingSender::default());
    let job = job_with(
        provider,
        vec![user("fan@example.com", vec![57], vec![])],
        sender.clone(),
        "+02:00",
    )
    .await;

    let report = job.run_at(now()).await.unwrap();
    assert_eq!(report.digests_sent, 0);
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_match_reached_through_two_favorites_is_listed_once() {
    let today = Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap();
    let mut provider = ScriptedProvider::default();
    provider
        .fixtures
        .insert((SubjectKind::Team, 57), vec![fixture(400, 2021, today)]);
    provider.fixtures.insert(
        (SubjectKind::Competition, 2021),
        vec![fixture(400, 2021, today), fixture(400, 2021, today)],
    );

    let sender = Arc::new(RecordingSender::default());
    let job = job_with(
        provider,
        vec![user("fan@example.com", vec![57], vec![2021])],
        sender.clone(),
        "+00:00",
    )
    .await;

    job.run_at(now()).await.unwrap();
    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].matches.len(), 1);
    // One entry per (kind, subject, match)
    assert_eq!(sent[0].candidates.len(), 2);
}

#[tokio::test]
async fn test_failures_are_counted_not_raised() {
    let today = Utc.with_ymd_and_hms(2026, 10, 16, 15, 0, 0).unwrap();
    let mut provider = ScriptedProvider::default();
    provider.failing.push((SubjectKind::Competition, 2001));
    provider
        .fixtures
        .insert((SubjectKind::Team, 57), vec![fixture(500, 2021, today)]);

    let sender = Arc::new(RecordingSender {
        fail_for: Some("broken@example.com".to_string()),
        ..Default::default()
    });
    let job = job_with(
        provider,
        vec![
            user("fan@example.com", vec![57], vec![2001]),
            user("broken@example.com", vec![57], vec![]),
        ],
        sender.clone(),
        "+00:00",
    )
    .await;

    let report = job.run_at(now()).await.unwrap();
    assert_eq!(report.favorites_failed, 1);
    assert_eq!(report.digests_sent, 1);
    assert_eq!(report.digests_failed, 1);
}

#[tokio::test]
async fn test_lookups_pass_through_governor() {
    let governor = RequestGovernor::new(GovernorConfig {
        threshold: 100,
        cooldown_secs: 1,
        progress_interval_secs: 1,
    });
    let provider = GovernedProvider::new(ScriptedProvider::default(), governor.clone());
    let store = Arc::new(MemoryStore::new());
    store
        .insert_user(user("fan@example.com", vec![57, 61], vec![2021]))
        .await;

    let job = NotificationJob::new(
        Arc::new(provider),
        store,
        Arc::new(RecordingSender::default()),
        &config("+00:00"),
        1,
    )
    .unwrap();

    job.run_at(now()).await.unwrap();
    assert_eq!(governor.status().call_count, 3);
}
