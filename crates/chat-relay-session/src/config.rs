//! Relay configuration.

use chat_relay_core::SharedLog;
use serde::{Deserialize, Serialize};

/// Relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Maximum number of log entries. `None` keeps the log unbounded.
    ///
    /// Reaching the limit is treated as resource exhaustion and is fatal.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl RelayConfig {
    /// Set the log entry limit.
    #[must_use]
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Build the shared log described by this configuration.
    #[must_use]
    pub fn build_log(&self) -> SharedLog {
        self.max_entries
            .map_or_else(SharedLog::new, SharedLog::with_capacity_limit)
    }
}
