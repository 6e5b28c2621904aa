//! Session error types.

use chat_relay_core::{LogError, TransportError};
use thiserror::Error;

use crate::SessionId;

/// Session error.
///
/// Everything except [`SessionError::Log`] is local to one session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Receive failed: {0}")]
    Receive(#[source] TransportError),
    #[error("Send failed: {0}")]
    Send(#[source] TransportError),
    #[error("Log error: {0}")]
    Log(#[from] LogError),
    #[error("Session task failed: {0}")]
    Task(String),
    #[error("Session not found: {0}")]
    NotFound(SessionId),
}

impl SessionError {
    /// Whether the error is unrecoverable for the whole process.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Log(_))
    }
}
