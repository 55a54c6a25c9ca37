//! Ingestion status and trigger endpoints

use axum::{
    extract::State,
    http::{header, HeaderMap},
    routing::{get, post},
    Router,
};
use matchday_ingest::governor::GovernorStatus;
use matchday_ingest::orchestrator::RunReport;
use matchday_ingest::schedule::RunStatus;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiOutcome, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/governor", get(governor_status))
        .route("/ingest/runs", post(trigger_run))
        .route("/ingest/runs/latest", get(latest_run))
}

async fn governor_status(State(state): State<AppState>) -> ApiOutcome<GovernorStatus> {
    ApiOutcome::Ready(state.governor.status())
}

async fn latest_run(State(state): State<AppState>) -> ApiOutcome<RunReport> {
    match state.ingestion.tracker().status() {
        RunStatus::InFlight => ApiOutcome::processing(),
        RunStatus::Finished(report) => ApiOutcome::Ready(report),
        RunStatus::Idle => ApiOutcome::Empty,
    }
}

/// Answer to a trigger request; progress is polled on `/ingest/runs/latest`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    /// False when a run was already in flight
    pub started: bool,
}

/// Start an ingestion run unless one is already in flight
async fn trigger_run(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiOutcome<TriggerResponse> {
    if !is_admin(&headers, state.admin_token.as_deref()) {
        return ApiOutcome::Unauthorized;
    }

    let started = state.ingestion.trigger();
    info!(started = started, "Ingestion run requested");
    ApiOutcome::Ready(TriggerResponse { started })
}

fn is_admin(headers: &HeaderMap, admin_token: Option<&str>) -> bool {
    let Some(expected) = admin_token else {
        return false;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}
