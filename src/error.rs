//! Error types for queueboard operations.
//!
//! Defines one error enum per subsystem:
//! - Connection configuration (descriptor building, retry policy validation)
//! - Datastore access (transport, TLS material, command failures)
//! - Queue discovery (no queues found vs. datastore failure)

use thiserror::Error;

/// Errors raised while turning configuration into a usable descriptor or policy.
///
/// These are fatal and synchronous: they are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration for '{key}': {reason}")]
    InvalidConfiguration { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while talking to the datastore.
#[derive(Debug, Error)]
pub enum DatastoreError {
    /// The endpoint could not be reached or the session dropped.
    #[error("Redis connection failed: {0}")]
    Connection(String),

    /// None of the configured sentinels could resolve the monitored node.
    #[error("Sentinel lookup for '{name}' failed: {reason}")]
    SentinelLookup { name: String, reason: String },

    /// TLS material referenced by the descriptor could not be loaded.
    #[error("Failed to load TLS material from '{path}': {source}")]
    TlsMaterial {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A command reached the server but failed.
    #[error("Redis command failed: {0}")]
    Command(#[from] redis::RedisError),
}

impl DatastoreError {
    /// Whether the failure happened before a command could reach a server.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Connection(_) | Self::SentinelLookup { .. } | Self::TlsMaterial { .. } => true,
            Self::Command(e) => {
                e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error()
            }
        }
    }
}

/// Errors that can occur while discovering queues.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The datastore answered but no key matched the namespace prefix.
    #[error("No queue found under prefix '{prefix}'")]
    NoQueuesFound { prefix: String },

    /// The datastore could not be queried.
    #[error("Queue discovery failed: {0}")]
    Connection(#[from] DatastoreError),
}

impl DiscoveryError {
    /// Label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoQueuesFound { .. } => "no_queues_found",
            Self::Connection(_) => "connection_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_display() {
        let err = ConfigError::invalid("SENTINEL_HOSTS", "entry 'host1' has no port");
        assert!(err.to_string().contains("SENTINEL_HOSTS"));
        assert!(err.to_string().contains("host1"));
    }

    #[test]
    fn test_discovery_error_messages_differ() {
        let empty = DiscoveryError::NoQueuesFound {
            prefix: "bull".to_string(),
        };
        let conn = DiscoveryError::from(DatastoreError::Connection("refused".to_string()));

        assert!(empty.to_string().contains("No queue found"));
        assert!(conn.to_string().contains("refused"));
        assert_ne!(empty.kind(), conn.kind());
    }

    #[test]
    fn test_connection_failure_classification() {
        assert!(DatastoreError::Connection("down".to_string()).is_connection_failure());
        let lookup = DatastoreError::SentinelLookup {
            name: "mymaster".to_string(),
            reason: "all sentinels unreachable".to_string(),
        };
        assert!(lookup.is_connection_failure());
    }
}
