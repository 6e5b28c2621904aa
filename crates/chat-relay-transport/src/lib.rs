//! Transports for the chat relay.
//!
//! Provides:
//! - Wire protocol (tagged JSON)
//! - Line-delimited JSON framing over any async byte stream
//! - TCP accept loop
//! - WebSocket transport (feature: websocket)

pub mod line;
pub mod protocol;
pub mod tcp;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use line::{LineSink, LineSource};
pub use protocol::{ClientMessage, ServerMessage};
