//! queueboard: queue discovery and datastore health for Bull/BullMQ dashboards.
//!
//! Builds a Redis connection (single node or Sentinel) from the environment,
//! enumerates the job queues stored under a key prefix with bounded
//! exponential backoff, and reports datastore liveness.

pub mod cli;
pub mod connection;
pub mod datastore;
pub mod discovery;
pub mod error;
pub mod health;
pub mod metrics;

pub use connection::ConnectionDescriptor;
pub use datastore::{Datastore, RedisDatastore};
pub use discovery::{discover_queues, discover_with_retry, QueueAdapter, QueueBoard, RetryPolicy};
pub use error::{ConfigError, DatastoreError, DiscoveryError};
pub use health::{check_liveness, health_report, HealthReport, LivenessStatus};
