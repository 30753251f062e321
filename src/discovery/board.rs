//! The live queue list shown by the dashboard.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::error;

use crate::datastore::Datastore;
use crate::error::DiscoveryError;

use super::queue::{QueueAdapter, QueueFlavor};
use super::retry::{discover_with_retry, RetryPolicy};

/// Shared, replaceable list of queue adapters.
///
/// Starts empty. [`QueueBoard::populate`] fills it once at startup; a
/// failed discovery leaves it empty and is logged, never propagated.
#[derive(Debug, Clone, Default)]
pub struct QueueBoard {
    queues: Arc<RwLock<Vec<QueueAdapter>>>,
}

impl QueueBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole queue list.
    pub async fn set_queues(&self, queues: Vec<QueueAdapter>) {
        *self.queues.write().await = queues;
    }

    /// Snapshot of the current queue list.
    pub async fn queues(&self) -> Vec<QueueAdapter> {
        self.queues.read().await.clone()
    }

    pub async fn queue_names(&self) -> Vec<String> {
        self.queues
            .read()
            .await
            .iter()
            .map(|q| q.name().to_string())
            .collect()
    }

    /// Runs the resilient discovery loop and publishes its result.
    ///
    /// Returns the terminal error for callers that want to report it, but
    /// it has already been logged.
    pub async fn populate(
        &self,
        client: &Arc<dyn Datastore>,
        prefix: &str,
        flavor: QueueFlavor,
        policy: &RetryPolicy,
    ) -> Result<usize, DiscoveryError> {
        match discover_with_retry(client, prefix, flavor, policy).await {
            Ok(queues) => {
                let count = queues.len();
                self.set_queues(queues).await;
                Ok(count)
            }
            Err(err) => {
                error!(
                    prefix,
                    attempts = policy.max_attempts(),
                    kind = err.kind(),
                    error = %err,
                    "Queue discovery failed, dashboard starts with no queues"
                );
                Err(err)
            }
        }
    }
}
