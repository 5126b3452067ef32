use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::TokenStore;

/// Unauthenticated entry point announced when the session is invalidated
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Buffer size for the session event channel.
/// Invalidations are rare; 16 leaves room for a burst of concurrent 401s.
const EVENT_BUFFER_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The backend rejected the credential; the host should send the user
    /// back to `login_path`.
    Invalidated { login_path: String },
}

/// Session context shared by the host application and the request pipeline.
/// Clone is cheap - the store and the event channel are shared.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<SessionEvent>,
    login_path: String,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            store,
            events,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Get the stored bearer token
    pub fn token(&self) -> Result<Option<String>> {
        self.store.get()
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.store.set(token)?;
        debug!("Session token stored");
        Ok(())
    }

    /// Clear the stored token without announcing anything
    pub fn clear(&self) -> Result<()> {
        self.store.remove()?;
        debug!("Session token cleared");
        Ok(())
    }

    /// True when a token is stored; unreadable storage counts as signed out
    pub fn is_authenticated(&self) -> bool {
        matches!(self.store.get(), Ok(Some(_)))
    }

    /// Drop the credential and tell subscribers the session is gone.
    pub fn invalidate(&self) {
        if let Err(e) = self.store.remove() {
            error!(error = %e, "Failed to delete session token");
        }

        let event = SessionEvent::Invalidated {
            login_path: self.login_path.clone(),
        };
        match self.events.send(event) {
            Ok(receivers) => info!(receivers, login_path = %self.login_path, "Session invalidated"),
            Err(_) => info!(login_path = %self.login_path, "Session invalidated (no subscribers)"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
