//! API endpoint path builders

use matchday_common::types::{ExternalId, SubjectKind};

/// Latest ingestion run report
pub fn latest_run_path() -> &'static str {
    "/api/v1/ingest/runs/latest"
}

/// Trigger an ingestion run
pub fn trigger_run_path() -> &'static str {
    "/api/v1/ingest/runs"
}

/// Favorite team or competition of the signed-in user
pub fn favorite_path(kind: SubjectKind, id: ExternalId) -> String {
    let collection = match kind {
        SubjectKind::Team => "teams",
        SubjectKind::Competition => "competitions",
    };
    format!("/api/v1/me/favorites/{}/{}", collection, id)
}
