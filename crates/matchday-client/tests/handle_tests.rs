//! Integration tests for query/mutation handles and optimistic favorites

use std::time::Duration;

use matchday_client::optimistic::FavoriteError;
use matchday_client::{
    ClientConfig, CredentialStore, FavoriteSet, Favorites, MutationHandle, PollOutcome,
    PollingClient, QueryHandle, QueryOptions, QueryState, SessionSignal,
};
use matchday_common::types::SubjectKind;
use serde_json::{json, Value};
use tokio::sync::watch;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> PollingClient {
    PollingClient::new(
        ClientConfig::new(server.uri()),
        CredentialStore::with_token("user-token"),
        SessionSignal::new(),
    )
    .unwrap()
}

async fn settled<T: Clone>(
    rx: &mut watch::Receiver<QueryState<T>>,
    done: impl FnMut(&QueryState<T>) -> bool,
) -> QueryState<T> {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done))
        .await
        .expect("state should settle")
        .expect("sender alive")
        .clone()
}

#[tokio::test]
async fn test_query_new_target_supersedes_old() {
    let server = MockServer::start().await;
    Mock::given(path("/teams/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 1}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    Mock::given(path("/teams/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2})))
        .mount(&server)
        .await;

    let query: QueryHandle<u32, Value> = QueryHandle::new(
        client(&server),
        |id| format!("/teams/{}", id),
        Some(1),
        QueryOptions::default(),
    );
    let mut rx = query.subscribe();
    query.set_target(2);

    let state = settled(&mut rx, |s| !s.loading && s.data.is_some()).await;
    assert_eq!(state.data, Some(json!({"id": 2})));

    // The slow response for the first target must never land
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(query.state().data, Some(json!({"id": 2})));
}

#[tokio::test]
async fn test_query_reports_processing_then_data() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v1/ingest/runs/latest"))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/api/v1/ingest/runs/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobs": []})))
        .mount(&server)
        .await;

    let query: QueryHandle<(), Value> = QueryHandle::new(
        client(&server),
        |_| "/api/v1/ingest/runs/latest".to_string(),
        Some(()),
        QueryOptions::default(),
    );
    let mut rx = query.subscribe();

    let state = settled(&mut rx, |s| s.processing).await;
    assert!(state.loading);

    let state = settled(&mut rx, |s| !s.loading).await;
    assert!(!state.processing);
    assert_eq!(state.data, Some(json!({"jobs": []})));
}

#[tokio::test]
async fn test_dropping_query_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v1/ingest/runs/latest"))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/api/v1/ingest/runs/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobs": []})))
        .expect(0)
        .mount(&server)
        .await;

    let query: QueryHandle<(), Value> = QueryHandle::new(
        client(&server),
        |_| "/api/v1/ingest/runs/latest".to_string(),
        Some(()),
        QueryOptions::default(),
    );
    let mut rx = query.subscribe();
    settled(&mut rx, |s| s.processing).await;

    drop(query);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    // The re-poll never went out, so nothing was published
    assert_eq!(rx.borrow().data, None);
}

#[tokio::test]
async fn test_disabled_query_does_not_run() {
    let server = MockServer::start().await;
    Mock::given(path("/teams/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let query: QueryHandle<u32, Value> = QueryHandle::new(
        client(&server),
        |id| format!("/teams/{}", id),
        Some(1),
        QueryOptions {
            enabled: false,
            initial_data: Some(json!({"id": 0})),
            ..QueryOptions::default()
        },
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(query.state().data, Some(json!({"id": 0})));

    let mut rx = query.subscribe();
    query.set_enabled(true);
    let state = settled(&mut rx, |s| s.data == Some(json!({"id": 1}))).await;
    assert!(!state.loading);
}

#[tokio::test]
async fn test_mutation_put_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/me/settings"))
        .and(body_json(json!({"utc_offset_minutes": 60})))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"saved": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mutation: MutationHandle<Value> = MutationHandle::new(client(&server), true);
    let outcome = mutation
        .put("/api/v1/me/settings", Some(json!({"utc_offset_minutes": 60})))
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Ready(Some(json!({"saved": true}))));
    assert_eq!(mutation.state().data, Some(json!({"saved": true})));
    assert!(!mutation.state().loading);
}

#[tokio::test]
async fn test_favorites_commit_and_rollback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/me/favorites/competitions/2021"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/me/favorites/teams/65"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "db down"}})),
        )
        .mount(&server)
        .await;

    let favorites = Favorites::new(client(&server), FavoriteSet::default());

    favorites
        .add(SubjectKind::Competition, 2021)
        .await
        .unwrap();
    assert!(favorites.current().contains(SubjectKind::Competition, 2021));

    let err = favorites.add(SubjectKind::Team, 65).await.unwrap_err();
    assert!(matches!(err, FavoriteError::Remote(_)));
    assert_eq!(err.to_string(), "db down");
    assert!(!favorites.current().contains(SubjectKind::Team, 65));
    assert!(favorites.current().contains(SubjectKind::Competition, 2021));
}
