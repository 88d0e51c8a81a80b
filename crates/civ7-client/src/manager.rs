//! Session registry.
//!
//! The [`SessionManager`] is the one place consumers obtain sessions from.
//! With endpoint sharing on, every `open` for the same host and port returns
//! the same live session, so the terminal and the agent bridge funnel their
//! commands through one queue and one socket. With it off, each `open` gets
//! its own connection, which only works if the game accepts several sockets.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use civ7_core::SessionConfig;

use crate::session::{Endpoint, Session, SessionId};

/// Manager settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Return the existing live session for an endpoint instead of opening a
    /// second socket
    pub share_endpoints: bool,
    /// Settings for every session this manager opens
    pub session: SessionConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self { share_endpoints: true, session: SessionConfig::default() }
    }
}

/// Creates, tracks and tears down sessions.
#[derive(Debug)]
pub struct SessionManager {
    config: ManagerConfig,
    next_id: AtomicU64,
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionManager {
    /// Create an empty manager.
    pub fn new(config: ManagerConfig) -> Self {
        Self { config, next_id: AtomicU64::new(1), sessions: Mutex::new(HashMap::new()) }
    }

    /// Active configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Session for `host:port`.
    ///
    /// Reuses a tracked, non-closed session for the endpoint when sharing is
    /// enabled; otherwise spawns a new one. Must be called from within a
    /// tokio runtime.
    pub fn open(&self, host: &str, port: u16) -> Session {
        let endpoint = Endpoint::new(host, port);
        let mut sessions = self.lock();

        // Sessions closed directly through their handle are pruned here.
        sessions.retain(|_, session| !session.is_closed());

        if self.config.share_endpoints {
            if let Some(existing) = sessions.values().find(|s| *s.endpoint() == endpoint) {
                tracing::debug!(session = %existing.id(), %endpoint, "reusing session");
                return existing.clone();
            }
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = Session::spawn(id, endpoint, self.config.session.clone());
        sessions.insert(id, session.clone());

        tracing::info!(session = %id, endpoint = %session.endpoint(), "session opened");
        session
    }

    /// Close `session` and stop tracking it.
    ///
    /// A later `open` for the same endpoint creates a fresh session.
    pub async fn close(&self, session: &Session) {
        let removed = self.lock().remove(&session.id());
        if removed.is_none() {
            tracing::debug!(session = %session.id(), "closing untracked session");
        }

        session.close().await;
    }

    /// Tracked sessions, ordered by id.
    pub fn sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.lock().values().cloned().collect();
        sessions.sort_by_key(Session::id);
        sessions
    }

    /// Close every tracked session.
    pub async fn shutdown(&self) {
        let sessions: Vec<Session> = self.lock().drain().map(|(_, session)| session).collect();

        for session in sessions {
            session.close().await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Session>> {
        // No code path panics while holding the lock.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}
