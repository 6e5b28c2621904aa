//! Line-delimited JSON framing.
//!
//! One frame per `\n`-terminated line. Blank lines are skipped and `\r\n`
//! is accepted, so the relay interoperates with netcat-style tools.

use async_trait::async_trait;
use chat_relay_core::{ChatMessage, MessageSink, MessageSource, TransportError};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::{ClientMessage, ServerMessage, decode, encode};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Read the next frame.
///
/// Returns `Ok(None)` at end of stream.
///
/// # Errors
/// Returns [`TransportError::Io`] on read failure and
/// [`TransportError::Protocol`] for a line that is not a valid frame.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, TransportError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(None);
        }

        // Invalid UTF-8 is a bad frame, not a broken stream.
        let text =
            std::str::from_utf8(&line).map_err(|e| TransportError::Protocol(e.to_string()))?;
        let trimmed = text.trim_end_matches(LINE_ENDINGS);
        if trimmed.is_empty() {
            continue;
        }
        return decode(trimmed).map(Some);
    }
}

/// Write one frame and flush.
///
/// # Errors
/// Returns [`TransportError::Io`] on write failure.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut encoded = encode(msg)?.into_bytes();
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

/// Server-side inbound half over a buffered reader.
pub struct LineSource<R> {
    reader: R,
}

impl<R> LineSource<R> {
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> MessageSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<ChatMessage>, TransportError> {
        loop {
            match read_frame::<_, ClientMessage>(&mut self.reader).await {
                Ok(frame) => return Ok(frame.map(ChatMessage::from)),
                Err(TransportError::Protocol(e)) => {
                    tracing::warn!("Invalid client message: {e}");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Server-side outbound half over a writer.
pub struct LineSink<W> {
    writer: W,
}

impl<W> LineSink<W> {
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> MessageSink for LineSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, msg: &ChatMessage) -> Result<(), TransportError> {
        write_frame(&mut self.writer, &ServerMessage::from(msg)).await
    }
}
