//! Outbound half of a session.

use std::{convert::Infallible, sync::Arc};

use chat_relay_core::{MessageSink, SharedLog};

use crate::{SessionError, SessionId};

/// Sender state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Delivering the backlog that existed when the session started.
    Replay,
    /// Blocked on the log's broadcast wake.
    Wait,
    /// Delivering entries past the cursor after a wake.
    Drain,
}

/// Streams the shared log to one client.
///
/// The read cursor counts entries already delivered and is owned by this
/// sender alone. Every transmit advances it by one, so the client sees the
/// log in order with no gaps and no duplicates.
pub struct SessionSender<K> {
    session_id: SessionId,
    log: Arc<SharedLog>,
    sink: K,
    cursor: usize,
    state: SenderState,
}

impl<K: MessageSink> SessionSender<K> {
    /// Create a sender with its cursor at the start of the log.
    #[must_use]
    pub const fn new(session_id: SessionId, log: Arc<SharedLog>, sink: K) -> Self {
        Self {
            session_id,
            log,
            sink,
            cursor: 0,
            state: SenderState::Replay,
        }
    }

    /// Entries delivered so far.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub const fn state(&self) -> SenderState {
        self.state
    }

    /// Replay the backlog, then follow the log.
    ///
    /// Only returns on a transmit failure; otherwise it runs until the
    /// coordinator aborts it.
    ///
    /// # Errors
    /// Returns [`SessionError::Send`] on the first failed transmit. No retry.
    pub async fn run(mut self) -> Result<Infallible, SessionError> {
        // Subscribe before the replay snapshot so an append racing with it
        // still produces a wake; the cursor absorbs the redundant drain.
        let mut wake = self.log.subscribe();

        loop {
            match self.state {
                SenderState::Replay => {
                    let replayed = self.drain().await?;
                    tracing::debug!(session_id = %self.session_id, replayed, "backlog replayed");
                    self.state = SenderState::Wait;
                }
                SenderState::Wait => {
                    // The wake channel lives as long as `self.log`.
                    if !wake.changed().await {
                        std::future::pending::<()>().await;
                    }
                    self.state = SenderState::Drain;
                }
                SenderState::Drain => {
                    self.drain().await?;
                    self.state = SenderState::Wait;
                }
            }
        }
    }

    async fn drain(&mut self) -> Result<usize, SessionError> {
        let pending = self.log.snapshot(self.cursor);
        for msg in &pending {
            self.sink.send(msg).await.map_err(SessionError::Send)?;
            self.cursor += 1;
        }
        Ok(pending.len())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chat_relay_core::{ChatMessage, memory::memory_transport};
    use tokio::time::timeout;
    use uuid::Uuid;

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    async fn next(client: &mut chat_relay_core::memory::MemoryClient) -> String {
        timeout(WAIT, client.recv())
            .await
            .expect("delivery stalled")
            .expect("sink closed")
            .message
    }

    #[test]
    fn test_starts_in_replay_at_zero() {
        let (_client, _source, sink) = memory_transport();
        let sender = SessionSender::new(Uuid::new_v4(), Arc::new(SharedLog::new()), sink);
        assert_eq!(sender.state(), SenderState::Replay);
        assert_eq!(sender.cursor(), 0);
    }

    #[tokio::test]
    async fn test_replays_backlog_before_live_entries() {
        let log = Arc::new(SharedLog::new());
        log.append("m1".into()).unwrap();
        log.append("m2".into()).unwrap();

        let (mut client, _source, sink) = memory_transport();
        let task = tokio::spawn(SessionSender::new(Uuid::new_v4(), Arc::clone(&log), sink).run());

        assert_eq!(next(&mut client).await, "m1");
        assert_eq!(next(&mut client).await, "m2");

        log.append("m3".into()).unwrap();
        assert_eq!(next(&mut client).await, "m3");

        task.abort();
    }

    #[tokio::test]
    async fn test_burst_is_delivered_once_in_order() {
        let log = Arc::new(SharedLog::new());
        let (mut client, _source, sink) = memory_transport();
        let task = tokio::spawn(SessionSender::new(Uuid::new_v4(), Arc::clone(&log), sink).run());

        for i in 0..100 {
            log.append(ChatMessage::new(i.to_string())).unwrap();
        }

        for i in 0..100 {
            assert_eq!(next(&mut client).await, i.to_string());
        }
        assert!(
            timeout(Duration::from_millis(50), client.recv())
                .await
                .is_err(),
            "no duplicates after the burst"
        );

        task.abort();
    }

    #[tokio::test]
    async fn test_transmit_failure_ends_sender() {
        let log = Arc::new(SharedLog::new());
        log.append("one".into()).unwrap();

        let (mut client, _source, sink) = memory_transport();
        client.close_recv();

        let err = SessionSender::new(Uuid::new_v4(), log, sink)
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Send(_)));
    }

    #[tokio::test]
    async fn test_abort_releases_wait_registration() {
        let log = Arc::new(SharedLog::new());
        let (_client, _source, sink) = memory_transport();
        let task = tokio::spawn(SessionSender::new(Uuid::new_v4(), Arc::clone(&log), sink).run());

        timeout(WAIT, async {
            while log.waiter_count() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("sender never subscribed");

        task.abort();
        let _ = task.await;
        assert_eq!(log.waiter_count(), 0);
    }
}
