//! API response contract
//!
//! Every endpoint answers with one of the statuses polling clients know how
//! to interpret:
//!
//! | Outcome        | Status | Body / headers                       |
//! |----------------|--------|--------------------------------------|
//! | `Ready`        | 200    | JSON payload                         |
//! | `Empty`        | 204    | none                                 |
//! | `Processing`   | 202    | `Retry-After: <secs>`, `{message}`   |
//! | `Unauthorized` | 401    | `{message}`                          |
//! | `ClientError`  | 400    | `{message}`                          |
//! | `ServerError`  | 500    | `{message}`                          |

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Default delay suggested to clients polling a processing resource.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 3;

/// Error body shared by all non-success outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug)]
pub enum ApiOutcome<T> {
    Ready(T),
    Empty,
    Processing { retry_after_secs: u64 },
    Unauthorized,
    ClientError(String),
    ServerError(String),
}

impl<T> ApiOutcome<T> {
    pub fn processing() -> Self {
        ApiOutcome::Processing {
            retry_after_secs: DEFAULT_RETRY_AFTER_SECS,
        }
    }
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(MessageBody {
            message: message.into(),
        }),
    )
        .into_response()
}

impl<T: Serialize> IntoResponse for ApiOutcome<T> {
    fn into_response(self) -> Response {
        match self {
            ApiOutcome::Ready(data) => (StatusCode::OK, Json(data)).into_response(),
            ApiOutcome::Empty => StatusCode::NO_CONTENT.into_response(),
            ApiOutcome::Processing { retry_after_secs } => {
                let mut response = message(StatusCode::ACCEPTED, "processing");
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            },
            ApiOutcome::Unauthorized => message(StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiOutcome::ClientError(msg) => message(StatusCode::BAD_REQUEST, msg),
            ApiOutcome::ServerError(msg) => {
                tracing::error!("Internal error: {}", msg);
                message(StatusCode::INTERNAL_SERVER_ERROR, msg)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ready_is_ok_json() {
        let response = ApiOutcome::Ready(serde_json::json!({ "id": 57 })).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], 57);
    }

    #[tokio::test]
    async fn test_empty_is_no_content() {
        let response = ApiOutcome::<()>::Empty.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_processing_sets_retry_after() {
        let response = ApiOutcome::<()>::Processing {
            retry_after_secs: 5,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()[header::RETRY_AFTER], "5");
    }

    #[tokio::test]
    async fn test_error_outcomes_carry_message() {
        let response = ApiOutcome::<()>::ClientError("bad team id".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "bad team id");

        let response = ApiOutcome::<()>::ServerError("store offline".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "store offline");

        let response = ApiOutcome::<()>::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
