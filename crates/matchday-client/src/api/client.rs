//! Polling HTTP client for the Matchday server
//!
//! Issues a request, and while the server answers `202 Accepted` keeps
//! re-issuing it after the advertised `Retry-After` delay, up to a retry cap.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::protocol::{classify, Attempt, PollEvent, PollObserver, PollOutcome, RequestSpec};
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, SessionEvent, SessionSignal};
use crate::error::{ClientError, Result};

/// Cheap to clone; all clones share the connection pool and credentials
#[derive(Clone)]
pub struct PollingClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    config: ClientConfig,
    credentials: CredentialStore,
    session: SessionSignal,
}

impl PollingClient {
    pub fn new(
        config: ClientConfig,
        credentials: CredentialStore,
        session: SessionSignal,
    ) -> Result<Self> {
        config.validate()?;

        let http = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                credentials,
                session,
            }),
        })
    }

    /// Create from environment variables with an empty credential store
    pub fn from_env() -> Result<Self> {
        Self::new(
            ClientConfig::from_env()?,
            CredentialStore::new(),
            SessionSignal::new(),
        )
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.credentials
    }

    pub fn session(&self) -> &SessionSignal {
        &self.inner.session
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.config.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Run one logical request to completion
    ///
    /// Resolves to [`PollOutcome::Cancelled`] as soon as `cancel` fires,
    /// whether the client is waiting on the network or sleeping between polls.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        spec: &RequestSpec,
        cancel: &CancellationToken,
        observer: &dyn PollObserver,
    ) -> Result<PollOutcome<T>> {
        let max_retries = self.inner.config.max_retries;
        let mut retries_used: u32 = 0;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(PollOutcome::Cancelled);
            }

            attempt += 1;
            observer.on_event(PollEvent::Sent { attempt });
            debug!(method = %spec.method, path = %spec.path, attempt, "Sending request");

            let response = tokio::select! {
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                result = self.send(spec) => result?,
            };

            match response {
                Attempt::Success(None) => return Ok(PollOutcome::Ready(None)),
                Attempt::Success(Some(body)) => {
                    return Ok(PollOutcome::Ready(Some(serde_json::from_slice(&body)?)));
                },
                Attempt::Processing(hint) => {
                    if retries_used >= max_retries {
                        warn!(path = %spec.path, retries = retries_used, "Gave up waiting for server");
                        return Err(ClientError::ProcessingTimeout {
                            retries: retries_used,
                        });
                    }
                    retries_used += 1;

                    let delay = hint.unwrap_or_else(|| self.inner.config.default_delay());
                    observer.on_event(PollEvent::Processing {
                        retries_used,
                        delay,
                    });
                    debug!(path = %spec.path, retries_used, delay_secs = delay.as_secs(), "Server still processing");

                    if !self.wait(delay, cancel).await {
                        return Ok(PollOutcome::Cancelled);
                    }
                },
                Attempt::Unauthorized => {
                    info!(path = %spec.path, "Credentials rejected");
                    self.inner.credentials.clear();
                    self.inner.session.emit(SessionEvent::SignInRequired);
                    return Err(ClientError::Unauthorized);
                },
                Attempt::ClientError { status, message } => {
                    return Err(ClientError::Client { status, message });
                },
                Attempt::ServerError { status, message } => {
                    return Err(ClientError::Server { status, message });
                },
            }
        }
    }

    async fn send(&self, spec: &RequestSpec) -> Result<Attempt> {
        let mut request = self
            .inner
            .http
            .request(spec.method.clone(), self.url(&spec.path))
            .header(ACCEPT, "application/json");

        if spec.authenticated {
            if let Some(token) = self.inner.credentials.token() {
                request = request.header(AUTHORIZATION, format!("Bearer {}", token));
            }
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(classify(status, &headers, body.to_vec()))
    }

    /// Sleep for `delay`; false when cancelled first
    async fn wait(&self, delay: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
