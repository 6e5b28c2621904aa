//! Session orchestration for the chat relay.
//!
//! Provides:
//! - `Relay` - Process-wide entry point, one `serve_connection` per client
//! - `SessionCoordinator` - Pairs a receiver and sender and tears both down together
//! - `SessionReceiver` / `SessionSender` - The two halves of a session
//! - `SessionRegistry` - Live session tracking and remote shutdown

pub mod config;
pub mod coordinator;
pub mod error;
pub mod receiver;
pub mod registry;
pub mod relay;
pub mod sender;

pub use config::RelayConfig;
pub use coordinator::{SessionCoordinator, SessionOutcome};
pub use error::SessionError;
pub use receiver::SessionReceiver;
pub use registry::{SessionId, SessionInfo, SessionRegistry};
pub use relay::Relay;
pub use sender::{SenderState, SessionSender};
