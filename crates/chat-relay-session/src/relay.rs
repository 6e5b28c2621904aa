//! Process-wide relay entry point.

use std::sync::Arc;

use chat_relay_core::{LogError, MessageSink, MessageSource, SharedLog};
use tokio::sync::watch;

use crate::{
    RelayConfig, SessionCoordinator, SessionError, SessionInfo, SessionOutcome, SessionRegistry,
};

/// Chat relay.
///
/// Owns the shared log and the session registry. Every accepted connection
/// is handed to [`Relay::serve_connection`], concurrently with all others.
pub struct Relay {
    log: Arc<SharedLog>,
    registry: SessionRegistry,
    fatal: watch::Sender<Option<LogError>>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(&RelayConfig::default())
    }
}

impl Relay {
    /// Create a relay with an empty log.
    #[must_use]
    pub fn new(config: &RelayConfig) -> Self {
        let (fatal, _) = watch::channel(None);
        Self {
            log: Arc::new(config.build_log()),
            registry: SessionRegistry::new(),
            fatal,
        }
    }

    /// The shared log.
    #[must_use]
    pub const fn log(&self) -> &Arc<SharedLog> {
        &self.log
    }

    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Serve one client connection until it ends.
    ///
    /// Per-session failures are logged here and returned; they never affect
    /// other sessions. A fatal log error is also published to
    /// [`Relay::wait_fatal`].
    pub async fn serve_connection<S, K>(
        &self,
        peer: impl Into<String>,
        source: S,
        sink: K,
    ) -> SessionOutcome
    where
        S: MessageSource + 'static,
        K: MessageSink + 'static,
    {
        let (info, shutdown) = self.registry.register(peer).await;
        let SessionInfo { id, ref peer, .. } = info;
        tracing::info!(session_id = %id, %peer, backlog = self.log.len(), "session started");

        let outcome = SessionCoordinator::new(id, Arc::clone(&self.log))
            .run(source, sink, shutdown)
            .await;
        self.registry.remove(id).await;

        match &outcome {
            SessionOutcome::Closed { received } => {
                tracing::info!(session_id = %id, %peer, received, "session closed");
            }
            SessionOutcome::Shutdown => {
                tracing::info!(session_id = %id, %peer, "session shut down");
            }
            SessionOutcome::Failed(SessionError::Log(err)) => {
                tracing::error!(session_id = %id, %peer, error = %err, "shared log failure");
                self.fatal.send_replace(Some(err.clone()));
            }
            SessionOutcome::Failed(err) => {
                tracing::warn!(session_id = %id, %peer, error = %err, "session failed");
            }
        }

        outcome
    }

    /// Resolve once any session has hit a fatal log error.
    pub async fn wait_fatal(&self) -> LogError {
        let mut rx = self.fatal.subscribe();
        loop {
            if let Some(err) = rx.borrow_and_update().clone() {
                return err;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    /// Ask every live session to stop. Returns how many were signalled.
    pub async fn shutdown(&self) -> usize {
        let closed = self.registry.close_all().await;
        tracing::info!(closed, "relay shutting down");
        closed
    }
}
