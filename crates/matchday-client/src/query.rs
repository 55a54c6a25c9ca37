//! Reactive query handles
//!
//! A [`QueryHandle`] owns one logical GET whose path depends on a target key.
//! Changing the key or re-enabling the handle re-invokes it; every new
//! invocation supersedes the previous one. State is published on a
//! `tokio::sync::watch` channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{PollEvent, PollObserver, PollOutcome, PollingClient, RequestSpec};
use crate::error::Result;

/// Observable state of a query or mutation
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub loading: bool,
    /// User-facing message of the last failure
    pub error: Option<String>,
    /// The server has answered "processing" at least once for this attempt
    pub processing: bool,
}

impl<T> QueryState<T> {
    fn with_data(data: Option<T>) -> Self {
        Self {
            data,
            loading: false,
            error: None,
            processing: false,
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::with_data(None)
    }
}

/// Shared state plus the bookkeeping that decides which attempt may write it
pub(crate) struct Slot<T> {
    state: Arc<watch::Sender<QueryState<T>>>,
    generation: Arc<AtomicU64>,
    current: Mutex<Option<CancellationToken>>,
}

impl<T: Clone + Send + Sync + 'static> Slot<T> {
    pub(crate) fn new(initial: Option<T>) -> Self {
        let (tx, _) = watch::channel(QueryState::with_data(initial));
        Self {
            state: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            current: Mutex::new(None),
        }
    }

    /// Start a new attempt, cancelling whatever was in flight
    pub(crate) fn begin(&self) -> Ticket<T> {
        let cancel = CancellationToken::new();
        if let Some(previous) = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(cancel.clone())
        {
            previous.cancel();
        }

        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.loading = true;
            state.processing = false;
            state.error = None;
        });

        Ticket {
            generation,
            cancel,
            state: self.state.clone(),
            counter: self.generation.clone(),
        }
    }

    /// Cancel the in-flight attempt and settle the state
    pub(crate) fn cancel(&self) {
        if let Some(token) = self.current.lock().unwrap_or_else(|e| e.into_inner()).take() {
            token.cancel();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|state| {
            let changed = state.loading || state.processing;
            state.loading = false;
            state.processing = false;
            changed
        });
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    pub(crate) fn snapshot(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if let Some(token) = self.current.lock().unwrap_or_else(|e| e.into_inner()).take() {
            token.cancel();
        }
    }
}

/// Write permission for one attempt; stale once a newer attempt begins
pub(crate) struct Ticket<T> {
    generation: u64,
    pub(crate) cancel: CancellationToken,
    state: Arc<watch::Sender<QueryState<T>>>,
    counter: Arc<AtomicU64>,
}

impl<T: Clone> Ticket<T> {
    fn is_current(&self) -> bool {
        !self.cancel.is_cancelled() && self.counter.load(Ordering::SeqCst) == self.generation
    }

    /// Publish the result unless this attempt has been superseded
    pub(crate) fn finish(&self, result: &Result<PollOutcome<T>>) {
        // The check runs under the channel lock, so it cannot interleave with `begin`
        self.state.send_if_modified(|state| {
            if !self.is_current() {
                return false;
            }
            match result {
                Ok(PollOutcome::Ready(data)) => {
                    state.data = data.clone();
                    state.error = None;
                },
                Ok(PollOutcome::Cancelled) => {}
                Err(err) => state.error = Some(err.to_string()),
            }
            state.loading = false;
            state.processing = false;
            true
        });
    }
}

impl<T: Clone + Send + Sync> PollObserver for Ticket<T> {
    fn on_event(&self, event: PollEvent) {
        if let PollEvent::Processing { .. } = event {
            self.state.send_if_modified(|state| {
                if !self.is_current() || state.processing {
                    return false;
                }
                state.processing = true;
                true
            });
        }
    }
}

/// Per-query settings
#[derive(Debug, Clone)]
pub struct QueryOptions<T> {
    pub enabled: bool,
    pub authenticated: bool,
    /// Data shown before the first response arrives
    pub initial_data: Option<T>,
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self {
            enabled: true,
            authenticated: false,
            initial_data: None,
        }
    }
}

struct Control<K> {
    target: Option<K>,
    enabled: bool,
}

/// Handle to a GET whose path is derived from a target key
///
/// Must be used from within a tokio runtime; invocations run on spawned
/// tasks. Dropping the handle cancels the in-flight attempt.
pub struct QueryHandle<K, T> {
    client: PollingClient,
    path: Arc<dyn Fn(&K) -> String + Send + Sync>,
    authenticated: bool,
    control: Mutex<Control<K>>,
    slot: Slot<T>,
}

impl<K, T> QueryHandle<K, T>
where
    K: PartialEq + Clone + Send + 'static,
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        client: PollingClient,
        path: impl Fn(&K) -> String + Send + Sync + 'static,
        target: Option<K>,
        options: QueryOptions<T>,
    ) -> Self {
        let handle = Self {
            client,
            path: Arc::new(path),
            authenticated: options.authenticated,
            control: Mutex::new(Control {
                target: target.clone(),
                enabled: options.enabled,
            }),
            slot: Slot::new(options.initial_data),
        };

        if let (true, Some(target)) = (options.enabled, target) {
            handle.invoke(&target);
        }
        handle
    }

    /// Point the query at a new key; re-invokes when the key changed
    pub fn set_target(&self, target: K) {
        let run = {
            let mut control = self.control.lock().unwrap_or_else(|e| e.into_inner());
            if control.target.as_ref() == Some(&target) {
                return;
            }
            control.target = Some(target.clone());
            control.enabled
        };
        if run {
            self.invoke(&target);
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        let target = {
            let mut control = self.control.lock().unwrap_or_else(|e| e.into_inner());
            if control.enabled == enabled {
                return;
            }
            control.enabled = enabled;
            control.target.clone()
        };

        if !enabled {
            self.slot.cancel();
        } else if let Some(target) = target {
            self.invoke(&target);
        }
    }

    /// Re-run the query now, superseding any attempt in flight
    pub fn refetch(&self) {
        let target = self
            .control
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .target
            .clone();
        if let Some(target) = target {
            self.invoke(&target);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.slot.subscribe()
    }

    pub fn state(&self) -> QueryState<T> {
        self.slot.snapshot()
    }

    fn invoke(&self, target: &K) {
        let spec = RequestSpec::get((self.path)(target)).authenticated(self.authenticated);
        let ticket = self.slot.begin();
        let client = self.client.clone();

        debug!(path = %spec.path, "Query invoked");
        tokio::spawn(async move {
            let result = client.execute::<T>(&spec, &ticket.cancel, &ticket).await;
            ticket.finish(&result);
        });
    }
}
