//! Inbound half of a session.

use std::sync::Arc;

use chat_relay_core::{MessageSource, SharedLog};

use crate::{SessionError, SessionId};

/// Reads messages from one client and appends them to the shared log.
pub struct SessionReceiver<S> {
    session_id: SessionId,
    log: Arc<SharedLog>,
    source: S,
}

impl<S: MessageSource> SessionReceiver<S> {
    /// Create a receiver for `session_id`.
    #[must_use]
    pub const fn new(session_id: SessionId, log: Arc<SharedLog>, source: S) -> Self {
        Self {
            session_id,
            log,
            source,
        }
    }

    /// Run until the client ends its stream.
    ///
    /// Returns the number of messages appended.
    ///
    /// # Errors
    /// Returns [`SessionError::Receive`] on a transport failure and
    /// [`SessionError::Log`] if the log refuses an append.
    pub async fn run(mut self) -> Result<usize, SessionError> {
        let mut received = 0;
        loop {
            let Some(msg) = self.source.recv().await.map_err(SessionError::Receive)? else {
                tracing::debug!(session_id = %self.session_id, received, "client ended stream");
                return Ok(received);
            };

            tracing::debug!(session_id = %self.session_id, text = %msg, "received message");
            self.log.append(msg)?;
            received += 1;
        }
    }
}
