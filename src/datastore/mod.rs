//! Datastore client used by queue discovery and the liveness probe.
//!
//! The [`Datastore`] trait is the seam between the discovery logic and the
//! driver. [`RedisDatastore`] implements it on top of a shared
//! `redis::aio::ConnectionManager`; tests substitute in-memory fakes.
//!
//! # Error notification
//!
//! Creating a client never touches the network. The session is opened by
//! the first command, and transport failures are reported twice: through
//! the command's `Result`, and as a [`ClientErrorEvent`] on the channel
//! returned by [`ErrorNotifier::subscribe`]. Subscribe before issuing
//! requests; events published while nobody is subscribed are dropped.

mod client;
mod tls;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::DatastoreError;

pub use client::RedisDatastore;

/// Buffered error events per subscriber before the oldest are overwritten.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Read-only operations the dashboard needs from the keyspace.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// All keys matching a glob-style pattern. Zero matches is not an error.
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, DatastoreError>;

    /// Liveness probe. Returns the server's reply (normally `PONG`).
    async fn ping(&self) -> Result<String, DatastoreError>;

    /// Length of a list key (0 when missing).
    async fn list_len(&self, key: &str) -> Result<u64, DatastoreError>;

    /// Cardinality of a sorted-set key (0 when missing).
    async fn sorted_set_len(&self, key: &str) -> Result<u64, DatastoreError>;
}

/// An asynchronous client failure, as seen by error subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientErrorEvent {
    /// Loggable description of the endpoint the client talks to.
    pub target: String,
    pub message: String,
}

/// Fan-out channel for client errors.
#[derive(Debug, Clone)]
pub struct ErrorNotifier {
    sender: broadcast::Sender<ClientErrorEvent>,
}

impl Default for ErrorNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Registers a new error handler.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientErrorEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Returns `false` when it was dropped for lack of
    /// subscribers.
    pub fn notify(&self, event: ClientErrorEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Spawns a task that logs every client error until the client is dropped.
pub fn spawn_error_logger(notifier: &ErrorNotifier) -> tokio::task::JoinHandle<()> {
    let mut receiver = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::warn!(target_node = %event.target, error = %event.message, "Redis client error");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Redis client error log lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(message: &str) -> ClientErrorEvent {
        ClientErrorEvent {
            target: "localhost:6379".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_unsubscribed_errors_are_dropped() {
        let notifier = ErrorNotifier::new();
        assert_eq!(notifier.subscriber_count(), 0);
        assert!(!notifier.notify(event("connection refused")));
    }

    #[tokio::test]
    async fn test_subscribers_receive_errors_published_after_subscribing() {
        let notifier = ErrorNotifier::new();
        assert!(!notifier.notify(event("before")));

        let mut receiver = notifier.subscribe();
        assert!(notifier.notify(event("after")));

        let received = receiver.recv().await.expect("event should be delivered");
        assert_eq!(received.message, "after");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_error_logger_stops_when_notifier_dropped() {
        let notifier = ErrorNotifier::new();
        let handle = spawn_error_logger(&notifier);
        assert_eq!(notifier.subscriber_count(), 1);

        notifier.notify(event("boom"));
        drop(notifier);

        handle.await.expect("logger task should finish cleanly");
    }
}
