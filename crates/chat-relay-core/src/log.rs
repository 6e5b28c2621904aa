//! Append-only shared message log with broadcast wake.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;

use crate::ChatMessage;

/// Shared log error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The configured entry limit was reached. Unrecoverable.
    #[error("Shared log capacity exhausted ({capacity} entries)")]
    CapacityExhausted { capacity: usize },
}

/// Ordered, append-only message log shared by every session.
///
/// Entries are never reordered or mutated: an entry visible at index `i`
/// stays at index `i` for the lifetime of the log. Appends and every
/// length/slice observation go through the same mutex, so readers only ever
/// see whole entries.
///
/// Each append is followed by a broadcast wake that releases every
/// [`LogSubscription`] currently waiting. The wake carries no payload;
/// subscribers compare their own cursor against [`SharedLog::len`].
pub struct SharedLog {
    entries: Mutex<Vec<Arc<ChatMessage>>>,
    capacity: Option<usize>,
    wake: watch::Sender<()>,
}

impl Default for SharedLog {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedLog {
    /// Create an unbounded log.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a log that refuses appends beyond `max_entries`.
    #[must_use]
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self::build(Some(max_entries))
    }

    fn build(capacity: Option<usize>) -> Self {
        let (wake, _) = watch::channel(());
        Self {
            entries: Mutex::new(Vec::with_capacity(32)),
            capacity,
            wake,
        }
    }

    // Every critical section is a plain push or clone, so a poisoned lock
    // still guards a consistent vector.
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<ChatMessage>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message and wake all subscribers.
    ///
    /// Returns the log length after the append.
    ///
    /// # Errors
    /// Returns [`LogError::CapacityExhausted`] if the log is full.
    pub fn append(&self, msg: ChatMessage) -> Result<usize, LogError> {
        let len = {
            let mut entries = self.lock();
            if let Some(capacity) = self.capacity {
                if entries.len() >= capacity {
                    return Err(LogError::CapacityExhausted { capacity });
                }
            }
            entries.push(Arc::new(msg));
            entries.len()
        };

        self.wake.send_replace(());
        tracing::trace!(len, "log appended");
        Ok(len)
    }

    /// Entries from `from` to the current end.
    ///
    /// An index past the end yields an empty vector.
    #[must_use]
    pub fn snapshot(&self, from: usize) -> Vec<Arc<ChatMessage>> {
        self.lock()
            .get(from..)
            .map(<[Arc<ChatMessage>]>::to_vec)
            .unwrap_or_default()
    }

    /// Current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log has no entries yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured entry limit, if any.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Register for growth notifications.
    ///
    /// Only appends that happen after this call wake the subscription.
    #[must_use]
    pub fn subscribe(&self) -> LogSubscription {
        LogSubscription {
            rx: self.wake.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.wake.receiver_count()
    }
}

/// Registration on the log's broadcast wake.
///
/// Dropping the subscription releases the registration.
pub struct LogSubscription {
    rx: watch::Receiver<()>,
}

impl LogSubscription {
    /// Wait until the log has grown since the last observation.
    ///
    /// Returns `false` if the log has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Whether an append happened since the last observation, without waiting.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}
