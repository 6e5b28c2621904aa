//! Chat message payload.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single chat message.
///
/// The relay treats the content as opaque text. Arrival order is implied by
/// the message's position in the [`SharedLog`](crate::SharedLog).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message content.
    pub message: String,
}

impl ChatMessage {
    /// Create a message from any string-like value.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Borrow the message content.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.message
    }
}

impl From<String> for ChatMessage {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ChatMessage {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
