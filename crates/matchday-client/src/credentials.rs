//! Credential storage and session signals

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, info};

/// Session-level events other parts of the application react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were rejected and cleared; the user must sign in again
    SignInRequired,
}

/// Shared bearer token store
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
        debug!("Credentials stored");
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
        info!("Credentials cleared");
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }
}

/// Broadcasts [`SessionEvent`]s to any number of listeners
#[derive(Debug, Clone)]
pub struct SessionSignal {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionSignal {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }
}

impl SessionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine
        let _ = self.tx.send(event);
    }
}
