//! Wire protocol for client-server communication.

use chat_relay_core::{ChatMessage, TransportError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Message from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Chat text to append to the relay log.
    Chat { message: String },
}

/// Message from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// One relay log entry, delivered in log order.
    Chat { message: String },
}

impl From<ClientMessage> for ChatMessage {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Chat { message } => Self { message },
        }
    }
}

impl From<&ChatMessage> for ServerMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self::Chat {
            message: msg.message.clone(),
        }
    }
}

impl From<ServerMessage> for ChatMessage {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Chat { message } => Self { message },
        }
    }
}

impl ClientMessage {
    /// Create a chat message.
    #[must_use]
    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat {
            message: message.into(),
        }
    }
}

/// Serialize a frame to JSON text.
///
/// # Errors
/// Returns [`TransportError::Protocol`] if serialization fails.
pub fn encode<T: Serialize>(msg: &T) -> Result<String, TransportError> {
    serde_json::to_string(msg).map_err(|e| TransportError::Protocol(e.to_string()))
}

/// Parse a frame from JSON text.
///
/// # Errors
/// Returns [`TransportError::Protocol`] if the text is not a valid frame.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, TransportError> {
    serde_json::from_str(text).map_err(|e| TransportError::Protocol(e.to_string()))
}
