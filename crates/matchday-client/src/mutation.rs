//! Mutation handles
//!
//! Same observable state as a query, but nothing runs until a trigger is
//! called. Starting a mutation cancels the one still in flight.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::api::{PollOutcome, PollingClient, RequestSpec};
use crate::error::Result;
use crate::query::{QueryState, Slot};

#[derive(Clone)]
pub struct MutationHandle<T> {
    client: PollingClient,
    authenticated: bool,
    slot: Arc<Slot<T>>,
}

impl<T> MutationHandle<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(client: PollingClient, authenticated: bool) -> Self {
        Self {
            client,
            authenticated,
            slot: Arc::new(Slot::new(None)),
        }
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<PollOutcome<T>> {
        self.run(RequestSpec::post(path, body)).await
    }

    pub async fn put(&self, path: &str, body: Option<Value>) -> Result<PollOutcome<T>> {
        self.run(RequestSpec::put(path, body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<PollOutcome<T>> {
        self.run(RequestSpec::delete(path)).await
    }

    /// Abandon the mutation in flight, if any
    pub fn cancel(&self) {
        self.slot.cancel();
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.slot.subscribe()
    }

    pub fn state(&self) -> QueryState<T> {
        self.slot.snapshot()
    }

    async fn run(&self, spec: RequestSpec) -> Result<PollOutcome<T>> {
        let spec = spec.authenticated(self.authenticated);
        let ticket = self.slot.begin();
        let result = self.client.execute(&spec, &ticket.cancel, &ticket).await;
        ticket.finish(&result);
        result
    }
}
