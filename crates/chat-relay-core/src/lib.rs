//! Core abstractions for the chat relay.
//!
//! This crate provides the fundamental building blocks:
//! - `SharedLog` - Append-only message log with broadcast wake for senders
//! - `ChatMessage` - The opaque text payload relayed between clients
//! - `MessageSource` / `MessageSink` - Transport traits, one pair per connection
//! - `memory` - In-process transport for tests and embedding

pub mod log;
pub mod memory;
pub mod message;
pub mod traits;

pub use log::{LogError, LogSubscription, SharedLog};
pub use message::ChatMessage;
pub use traits::{MessageSink, MessageSource, TransportError};
