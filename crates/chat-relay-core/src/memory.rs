//! In-process transport.
//!
//! Useful for tests and for embedding the relay without a network.
//! The [`MemoryClient`] plays the remote peer.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{ChatMessage, MessageSink, MessageSource, TransportError};

type Inbound = Result<ChatMessage, String>;

/// Create a connected client handle and the server-side transport halves.
#[must_use]
pub fn memory_transport() -> (MemoryClient, MemorySource, MemorySink) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();

    let client = MemoryClient {
        tx: Some(in_tx),
        rx: Some(out_rx),
    };
    (client, MemorySource { rx: in_rx }, MemorySink { tx: out_tx })
}

/// Client end of an in-memory connection.
pub struct MemoryClient {
    tx: Option<mpsc::UnboundedSender<Inbound>>,
    rx: Option<mpsc::UnboundedReceiver<ChatMessage>>,
}

impl MemoryClient {
    /// Send a message to the server.
    ///
    /// # Errors
    /// Returns [`TransportError::Closed`] if either side closed the inbound direction.
    pub fn send(&self, msg: impl Into<ChatMessage>) -> Result<(), TransportError> {
        self.inbound()?
            .send(Ok(msg.into()))
            .map_err(|_| TransportError::Closed)
    }

    /// Make the server's next receive fail with a protocol error.
    ///
    /// # Errors
    /// Returns [`TransportError::Closed`] if either side closed the inbound direction.
    pub fn inject_error(&self, reason: impl Into<String>) -> Result<(), TransportError> {
        self.inbound()?
            .send(Err(reason.into()))
            .map_err(|_| TransportError::Closed)
    }

    fn inbound(&self) -> Result<&mpsc::UnboundedSender<Inbound>, TransportError> {
        self.tx.as_ref().ok_or(TransportError::Closed)
    }

    /// Receive the next message delivered by the server.
    ///
    /// Returns `None` once the server has dropped its sink.
    pub async fn recv(&mut self) -> Option<ChatMessage> {
        self.rx.as_mut()?.recv().await
    }

    /// Half-close: the server sees end of stream after pending messages.
    pub fn close_send(&mut self) {
        self.tx = None;
    }

    /// Stop reading: further server transmits fail.
    pub fn close_recv(&mut self) {
        self.rx = None;
    }
}

/// Server-side inbound half of an in-memory connection.
pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<Inbound>,
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn recv(&mut self) -> Result<Option<ChatMessage>, TransportError> {
        match self.rx.recv().await {
            Some(Ok(msg)) => Ok(Some(msg)),
            Some(Err(reason)) => Err(TransportError::Protocol(reason)),
            None => Ok(None),
        }
    }
}

/// Server-side outbound half of an in-memory connection.
pub struct MemorySink {
    tx: mpsc::UnboundedSender<ChatMessage>,
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send(&mut self, msg: &ChatMessage) -> Result<(), TransportError> {
        self.tx.send(msg.clone()).map_err(|_| TransportError::Closed)
    }
}
