//! Integration tests for the polling client against a mock server
//!
//! These tests verify:
//! - 202 + Retry-After is retried until the final answer
//! - The retry cap turns into a "try again later" error
//! - 401 clears credentials and signals a sign-in exactly once
//! - Error bodies are parsed with a status fallback
//! - Cancellation during the wait and during the send
//! - Every request asks for JSON

use std::time::{Duration, Instant};

use matchday_client::{
    ClientConfig, ClientError, CredentialStore, NoopObserver, PollEvent, PollObserver,
    PollOutcome, PollingClient, RequestSpec, SessionEvent, SessionSignal,
};
use serde_json::{json, Value};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> PollingClient {
    client_with(server, ClientConfig::new(server.uri()), CredentialStore::new()).0
}

fn client_with(
    server: &MockServer,
    mut config: ClientConfig,
    credentials: CredentialStore,
) -> (PollingClient, SessionSignal) {
    config.server_url = server.uri();
    let session = SessionSignal::new();
    let client = PollingClient::new(config, credentials, session.clone()).unwrap();
    (client, session)
}

async fn get(client: &PollingClient, route: &str) -> matchday_client::Result<PollOutcome<Value>> {
    client
        .execute(&RequestSpec::get(route), &CancellationToken::new(), &NoopObserver)
        .await
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<PollEvent>>,
}

impl PollObserver for RecordingObserver {
    fn on_event(&self, event: PollEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[tokio::test]
async fn test_processing_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ingest/runs/latest"))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ingest/runs/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"run_id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let observer = RecordingObserver::default();
    let started = Instant::now();

    let outcome: PollOutcome<Value> = client
        .execute(
            &RequestSpec::get("/api/v1/ingest/runs/latest"),
            &CancellationToken::new(),
            &observer,
        )
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Ready(Some(json!({"run_id": "abc"}))));
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(3));

    let events = observer.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            PollEvent::Sent { attempt: 1 },
            PollEvent::Processing {
                retries_used: 1,
                delay: Duration::from_secs(1)
            },
            PollEvent::Sent { attempt: 2 },
        ]
    );
}

#[tokio::test]
async fn test_retry_cap_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(202))
        .expect(3)
        .mount(&server)
        .await;

    let config = ClientConfig {
        default_delay_secs: 0,
        max_retries: 2,
        ..ClientConfig::default()
    };
    let (client, _) = client_with(&server, config, CredentialStore::new());

    let err = get(&client, "/slow").await.unwrap_err();
    assert!(matches!(err, ClientError::ProcessingTimeout { retries: 2 }));
    assert!(err.to_string().contains("try again later"));
}

#[tokio::test]
async fn test_unauthorized_clears_credentials_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/ingest/runs"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = CredentialStore::with_token("stale-token");
    let (client, session) =
        client_with(&server, ClientConfig::default(), credentials.clone());
    let mut events = session.subscribe();

    let spec = RequestSpec::post("/api/v1/ingest/runs", None).authenticated(true);
    let err = client
        .execute::<Value>(&spec, &CancellationToken::new(), &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized));
    assert!(!credentials.is_signed_in());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignInRequired);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_error_messages() {
    let server = MockServer::start().await;
    Mock::given(path("/teams/999"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Team not found"})),
        )
        .mount(&server)
        .await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>down</html>"))
        .mount(&server)
        .await;

    let client = client(&server);

    match get(&client, "/teams/999").await.unwrap_err() {
        ClientError::Client { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Team not found");
        },
        other => panic!("unexpected error: {other:?}"),
    }

    match get(&client, "/broken").await.unwrap_err() {
        ClientError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "HTTP error, status 500");
        },
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let outcome: PollOutcome<Value> = client(&server)
        .execute(
            &RequestSpec::delete("/api/v1/me/favorites/teams/65"),
            &CancellationToken::new(),
            &NoopObserver,
        )
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Ready(None));
}

#[tokio::test]
async fn test_cancel_during_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "30"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome: PollOutcome<Value> = client
        .execute(&RequestSpec::get("/slow"), &cancel, &NoopObserver)
        .await
        .unwrap();

    assert!(outcome.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancel_during_send() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome: PollOutcome<Value> = client
        .execute(&RequestSpec::get("/hanging"), &cancel, &NoopObserver)
        .await
        .unwrap();

    assert!(outcome.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_requests_accept_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/governor"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"threshold": 9})))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = get(&client(&server), "/api/v1/governor").await.unwrap();
    assert_eq!(outcome, PollOutcome::Ready(Some(json!({"threshold": 9}))));
}
