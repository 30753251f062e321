//! One-shot queue discovery.
//!
//! Queue libraries store every structure of a queue under
//! `<prefix>:<queue>:<suffix>`, so the distinct second segments of the keys
//! under a prefix are the queue names.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::datastore::Datastore;
use crate::error::DiscoveryError;

use super::queue::{QueueAdapter, QueueFlavor};

/// Namespace prefix used by the queue libraries unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "bull";

/// Queue name encoded in `key`: its second colon-delimited segment.
///
/// Keys with fewer than three segments, or an empty first or second
/// segment, do not belong to a queue.
pub fn queue_identifier(key: &str) -> Option<&str> {
    let mut segments = key.splitn(3, ':');
    let prefix = segments.next()?;
    let name = segments.next()?;
    let rest = segments.next()?;

    if prefix.is_empty() || name.is_empty() || rest.is_empty() {
        return None;
    }
    Some(name)
}

/// Distinct queue names in `keys`, sorted ascending.
pub fn queue_names<S: AsRef<str>>(keys: &[S]) -> Vec<String> {
    keys.iter()
        .filter_map(|key| queue_identifier(key.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Lists the queues stored under `prefix` and wraps each in an adapter.
///
/// # Errors
///
/// `DiscoveryError::NoQueuesFound` when no key yields a queue name, and
/// `DiscoveryError::Connection` when the datastore cannot be queried.
pub async fn discover_queues(
    client: &Arc<dyn Datastore>,
    prefix: &str,
    flavor: QueueFlavor,
) -> Result<Vec<QueueAdapter>, DiscoveryError> {
    let pattern = format!("{}:*", prefix);
    let keys = client.list_keys(&pattern).await?;
    let names = queue_names(&keys);

    debug!(
        pattern = %pattern,
        keys = keys.len(),
        queues = names.len(),
        "Listed queue keys"
    );

    if names.is_empty() {
        return Err(DiscoveryError::NoQueuesFound {
            prefix: prefix.to_string(),
        });
    }

    Ok(names
        .into_iter()
        .map(|name| QueueAdapter::new(name, prefix, flavor, Arc::clone(client)))
        .collect())
}
