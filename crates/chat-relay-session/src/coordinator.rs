//! Per-connection session lifecycle.

use std::sync::Arc;

use chat_relay_core::{MessageSink, MessageSource, SharedLog};
use tokio::{sync::oneshot, task::JoinSet};

use crate::{SessionError, SessionId, SessionReceiver, SessionSender};

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The client ended its stream.
    Closed { received: usize },
    /// The session was stopped from outside.
    Shutdown,
    /// One half failed.
    Failed(SessionError),
}

impl SessionOutcome {
    /// The fatal error, if the session ended on one.
    #[must_use]
    pub const fn fatal_error(&self) -> Option<&SessionError> {
        match self {
            Self::Failed(err) if err.is_fatal() => Some(err),
            _ => None,
        }
    }
}

enum Half {
    Receiver(Result<usize, SessionError>),
    Sender(SessionError),
}

/// Runs one session's receiver and sender as a task pair.
///
/// Whichever half finishes first (or an external shutdown) ends the session;
/// the other half is aborted and awaited before [`SessionCoordinator::run`]
/// returns, so its log subscription and transport half are released.
pub struct SessionCoordinator {
    session_id: SessionId,
    log: Arc<SharedLog>,
}

impl SessionCoordinator {
    #[must_use]
    pub const fn new(session_id: SessionId, log: Arc<SharedLog>) -> Self {
        Self { session_id, log }
    }

    /// Drive the session to completion.
    ///
    /// A dropped `shutdown` sender counts as a shutdown request.
    pub async fn run<S, K>(
        self,
        source: S,
        sink: K,
        shutdown: oneshot::Receiver<()>,
    ) -> SessionOutcome
    where
        S: MessageSource + 'static,
        K: MessageSink + 'static,
    {
        let receiver = SessionReceiver::new(self.session_id, Arc::clone(&self.log), source);
        let sender = SessionSender::new(self.session_id, Arc::clone(&self.log), sink);

        let mut tasks = JoinSet::new();
        tasks.spawn(async move { Half::Receiver(receiver.run().await) });
        tasks.spawn(async move {
            let Err(err) = sender.run().await;
            Half::Sender(err)
        });

        let outcome = tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(Ok(Half::Receiver(Ok(received)))) => SessionOutcome::Closed { received },
                Some(Ok(Half::Receiver(Err(err)) | Half::Sender(err))) => {
                    SessionOutcome::Failed(err)
                }
                Some(Err(join_err)) => {
                    SessionOutcome::Failed(SessionError::Task(join_err.to_string()))
                }
                None => SessionOutcome::Failed(SessionError::Task("no session tasks".into())),
            },
            _ = shutdown => SessionOutcome::Shutdown,
        };

        tasks.shutdown().await;
        tracing::trace!(session_id = %self.session_id, "session tasks stopped");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chat_relay_core::memory::memory_transport;
    use tokio::time::timeout;
    use uuid::Uuid;

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_client_eof_stops_sender() {
        let log = Arc::new(SharedLog::new());
        let (mut client, source, sink) = memory_transport();
        let (_tx, rx) = oneshot::channel();

        client.send("bye").unwrap();
        client.close_send();

        let outcome = timeout(
            WAIT,
            SessionCoordinator::new(Uuid::new_v4(), Arc::clone(&log)).run(source, sink, rx),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, SessionOutcome::Closed { received: 1 }));
        assert_eq!(log.len(), 1);
        assert_eq!(log.waiter_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_both_halves() {
        let log = Arc::new(SharedLog::new());
        let (client, source, sink) = memory_transport();
        let (tx, rx) = oneshot::channel();

        let session = tokio::spawn(
            SessionCoordinator::new(Uuid::new_v4(), Arc::clone(&log)).run(source, sink, rx),
        );
        tx.send(()).unwrap();

        let outcome = timeout(WAIT, session).await.unwrap().unwrap();
        assert!(matches!(outcome, SessionOutcome::Shutdown));
        assert_eq!(log.waiter_count(), 0);
        // The receiver's source was dropped with its task.
        assert!(client.send("after").is_err());
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let log = Arc::new(SharedLog::new());
        log.append("backlog".into()).unwrap();
        let (mut client, source, sink) = memory_transport();
        let (_tx, rx) = oneshot::channel();
        client.close_recv();

        let outcome = timeout(
            WAIT,
            SessionCoordinator::new(Uuid::new_v4(), Arc::clone(&log)).run(source, sink, rx),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, SessionOutcome::Failed(SessionError::Send(_))));
        assert!(outcome.fatal_error().is_none());
        assert_eq!(log.len(), 1);
    }
}
