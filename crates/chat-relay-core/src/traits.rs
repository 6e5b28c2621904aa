//! Transport traits.
//!
//! A connection is split into a [`MessageSource`] (inbound half) and a
//! [`MessageSink`] (outbound half) so the session receiver and sender can run
//! concurrently without sharing the connection.

use async_trait::async_trait;
use thiserror::Error;

use crate::ChatMessage;

/// Transport error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Connection closed")]
    Closed,
}

/// Inbound half of a client connection.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next message from the client.
    ///
    /// Returns `Ok(None)` on a clean end of stream.
    async fn recv(&mut self) -> Result<Option<ChatMessage>, TransportError>;
}

/// Outbound half of a client connection.
#[async_trait]
pub trait MessageSink: Send {
    /// Transmit one message to the client.
    async fn send(&mut self, msg: &ChatMessage) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: MessageSource + ?Sized> MessageSource for Box<T> {
    async fn recv(&mut self) -> Result<Option<ChatMessage>, TransportError> {
        (**self).recv().await
    }
}

#[async_trait]
impl<T: MessageSink + ?Sized> MessageSink for Box<T> {
    async fn send(&mut self, msg: &ChatMessage) -> Result<(), TransportError> {
        (**self).send(msg).await
    }
}
