//! Optimistic local updates
//!
//! The local value changes immediately; if the remote call fails the value
//! is restored to the snapshot taken before the change.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use matchday_common::types::{ExternalId, SubjectKind};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::endpoints::favorite_path;
use crate::api::{PollOutcome, PollingClient};
use crate::error::ClientError;
use crate::mutation::MutationHandle;

/// A locally owned value with snapshot-and-compensate updates
#[derive(Debug, Clone)]
pub struct Optimistic<T> {
    value: Arc<watch::Sender<T>>,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { value: Arc::new(tx) }
    }

    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }

    /// Apply `change` now, then await `remote`; roll back if it fails
    ///
    /// Rolling back restores the whole snapshot, so concurrent updates on
    /// the same value made in between are lost as well.
    pub async fn apply<F, Fut, R, E>(&self, change: F, remote: Fut) -> Result<R, E>
    where
        F: FnOnce(&mut T),
        Fut: Future<Output = Result<R, E>>,
    {
        let snapshot = self.value.borrow().clone();
        self.value.send_modify(change);

        match remote.await {
            Ok(confirmed) => Ok(confirmed),
            Err(err) => {
                self.value.send_replace(snapshot);
                Err(err)
            },
        }
    }
}

/// Favorite teams and competitions of the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    pub teams: BTreeSet<ExternalId>,
    pub competitions: BTreeSet<ExternalId>,
}

impl FavoriteSet {
    pub fn contains(&self, kind: SubjectKind, id: ExternalId) -> bool {
        self.ids(kind).contains(&id)
    }

    fn ids(&self, kind: SubjectKind) -> &BTreeSet<ExternalId> {
        match kind {
            SubjectKind::Team => &self.teams,
            SubjectKind::Competition => &self.competitions,
        }
    }

    fn ids_mut(&mut self, kind: SubjectKind) -> &mut BTreeSet<ExternalId> {
        match kind {
            SubjectKind::Team => &mut self.teams,
            SubjectKind::Competition => &mut self.competitions,
        }
    }
}

#[derive(Error, Debug)]
pub enum FavoriteError {
    #[error(transparent)]
    Remote(#[from] ClientError),

    #[error("Favorite update was cancelled")]
    Cancelled,
}

/// Optimistically updated favorites backed by authenticated mutations
#[derive(Clone)]
pub struct Favorites {
    client: PollingClient,
    state: Optimistic<FavoriteSet>,
}

impl Favorites {
    pub fn new(client: PollingClient, initial: FavoriteSet) -> Self {
        Self {
            client,
            state: Optimistic::new(initial),
        }
    }

    pub fn current(&self) -> FavoriteSet {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoriteSet> {
        self.state.subscribe()
    }

    pub async fn add(&self, kind: SubjectKind, id: ExternalId) -> Result<(), FavoriteError> {
        self.update(kind, id, true).await
    }

    pub async fn remove(&self, kind: SubjectKind, id: ExternalId) -> Result<(), FavoriteError> {
        self.update(kind, id, false).await
    }

    async fn update(
        &self,
        kind: SubjectKind,
        id: ExternalId,
        favorite: bool,
    ) -> Result<(), FavoriteError> {
        let path = favorite_path(kind, id);
        let result = self
            .state
            .apply(
                |set| {
                    if favorite {
                        set.ids_mut(kind).insert(id);
                    } else {
                        set.ids_mut(kind).remove(&id);
                    }
                },
                self.send(&path, favorite),
            )
            .await;

        match &result {
            Ok(()) => info!(%kind, id, favorite, "Favorite updated"),
            Err(err) => warn!(%kind, id, favorite, error = %err, "Favorite update rolled back"),
        }
        result
    }

    async fn send(&self, path: &str, favorite: bool) -> Result<(), FavoriteError> {
        // One handle per call so updates to different subjects don't supersede each other
        let mutation: MutationHandle<serde_json::Value> =
            MutationHandle::new(self.client.clone(), true);

        let outcome = if favorite {
            mutation.post(path, None).await?
        } else {
            mutation.delete(path).await?
        };
        match outcome {
            PollOutcome::Ready(_) => Ok(()),
            PollOutcome::Cancelled => Err(FavoriteError::Cancelled),
        }
    }
}
