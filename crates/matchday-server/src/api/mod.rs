pub mod ingest;
pub mod response;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use matchday_ingest::governor::RequestGovernor;
use matchday_ingest::schedule::IngestionTask;
use serde_json::json;

use crate::config::CorsConfig;
use crate::middleware;

pub use response::ApiOutcome;

#[derive(Clone)]
pub struct AppState {
    pub governor: RequestGovernor,
    pub ingestion: IngestionTask,
    /// Bearer token accepted by admin endpoints
    pub admin_token: Option<String>,
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", ingest::router())
        .with_state(state)
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Matchday Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
