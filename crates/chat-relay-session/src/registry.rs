//! Live session tracking.

use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, oneshot};
use uuid::Uuid;

use crate::SessionError;

/// Session identifier, scoped to one connection.
pub type SessionId = Uuid;

/// Public view of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Unique session identifier.
    pub id: SessionId,
    /// Transport-supplied peer label (address, "memory", ...).
    pub peer: String,
    /// Start timestamp (Unix epoch seconds).
    pub started_at: i64,
}

struct ActiveSession {
    info: SessionInfo,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct Sessions {
    active: HashMap<SessionId, ActiveSession>,
    closed: bool,
}

/// Registry of live sessions with a shutdown handle per session.
///
/// Once [`SessionRegistry::close_all`] has run the registry stays closed:
/// later registrations get a shutdown receiver that has already fired.
pub struct SessionRegistry {
    sessions: RwLock<Sessions>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
        }
    }

    /// Register a new session.
    ///
    /// The returned receiver resolves when the session is asked to stop. On a
    /// closed registry it resolves immediately.
    pub async fn register(&self, peer: impl Into<String>) -> (SessionInfo, oneshot::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let info = SessionInfo {
            id: Uuid::new_v4(),
            peer: peer.into(),
            started_at: now(),
        };

        let mut sessions = self.sessions.write().await;
        let shutdown_tx = if sessions.closed {
            tracing::debug!(session_id = %info.id, "registry closed, session stops at once");
            let _ = shutdown_tx.send(());
            None
        } else {
            Some(shutdown_tx)
        };
        sessions.active.insert(
            info.id,
            ActiveSession {
                info: info.clone(),
                shutdown_tx,
            },
        );
        drop(sessions);

        (info, shutdown_rx)
    }

    /// Forget a session. Called once its coordinator has returned.
    pub async fn remove(&self, id: SessionId) -> Option<SessionInfo> {
        self.sessions.write().await.active.remove(&id).map(|s| s.info)
    }

    /// Ask one session to stop.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no such session is live.
    pub async fn close_session(&self, id: SessionId) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .active
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;
        if let Some(tx) = session.shutdown_tx.take() {
            let _ = tx.send(());
        }
        Ok(())
    }

    /// Ask every live session to stop and refuse new ones. Returns how many
    /// were signalled.
    pub async fn close_all(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        sessions.closed = true;
        sessions
            .active
            .values_mut()
            .filter_map(|s| s.shutdown_tx.take())
            .map(|tx| tx.send(()))
            .count()
    }

    /// Whether [`SessionRegistry::close_all`] has run.
    pub async fn is_closed(&self) -> bool {
        self.sessions.read().await.closed
    }

    /// Live sessions, oldest first.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let mut result: Vec<SessionInfo> = self
            .sessions
            .read()
            .await
            .active
            .values()
            .map(|s| s.info.clone())
            .collect();
        result.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        result
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.active.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.active.is_empty()
    }
}
