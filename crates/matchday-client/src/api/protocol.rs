//! Request description, poll outcomes and response classification

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

/// Everything needed to issue (and re-issue) one logical request
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the server URL, e.g. `/api/v1/ingest/runs/latest`
    pub path: String,
    pub body: Option<Value>,
    /// Attach the bearer token from the credential store
    pub authenticated: bool,
}

impl RequestSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            body,
            ..Self::new(Method::POST, path)
        }
    }

    pub fn put(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            body,
            ..Self::new(Method::PUT, path)
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            authenticated: false,
        }
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }
}

/// Final result of a successful or cancelled execution
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    /// Success; `None` for 204 or an empty body
    Ready(Option<T>),
    /// The cancellation token fired before a final answer arrived
    Cancelled,
}

impl<T> PollOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollOutcome::Cancelled)
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            PollOutcome::Ready(data) => data,
            PollOutcome::Cancelled => None,
        }
    }
}

/// Progress notifications emitted while a request is being polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// A request is about to go out
    Sent { attempt: u32 },
    /// The server answered "processing"; the next attempt follows `delay`
    Processing { retries_used: u32, delay: Duration },
}

pub trait PollObserver: Send + Sync {
    fn on_event(&self, event: PollEvent);
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PollObserver for NoopObserver {
    fn on_event(&self, _event: PollEvent) {}
}

/// How a single response moves the polling state machine
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Attempt {
    Success(Option<Vec<u8>>),
    Processing(Option<Duration>),
    Unauthorized,
    ClientError { status: u16, message: String },
    ServerError { status: u16, message: String },
}

pub(crate) fn classify(status: u16, headers: &HeaderMap, body: Vec<u8>) -> Attempt {
    match status {
        204 => Attempt::Success(None),
        202 => Attempt::Processing(retry_after(headers)),
        401 => Attempt::Unauthorized,
        200..=299 => {
            if body.iter().all(u8::is_ascii_whitespace) {
                Attempt::Success(None)
            } else {
                Attempt::Success(Some(body))
            }
        },
        400..=499 => Attempt::ClientError {
            status,
            message: error_message(status, &body),
        },
        _ => Attempt::ServerError {
            status,
            message: error_message(status, &body),
        },
    }
}

/// `Retry-After` in whole seconds; HTTP-date values are ignored
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<NestedError>,
}

#[derive(Deserialize)]
struct NestedError {
    message: Option<String>,
}

/// Human-readable message from an error body, with a status fallback
pub fn error_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or_else(|| b.error.and_then(|e| e.message)))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP error, status {}", status))
}
