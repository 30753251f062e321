//! Prometheus metrics for queue discovery and datastore health.
//!
//! # Example
//!
//! ```ignore
//! use queueboard::metrics::{export_metrics, init_metrics, MetricsCollector};
//!
//! init_metrics().expect("Failed to initialize metrics");
//!
//! let collector = MetricsCollector::new();
//! collector.record_discovery_attempt("success", Some(4));
//!
//! let metrics_text = export_metrics();
//! ```

pub mod collectors;
pub mod prometheus;

pub use collectors::MetricsCollector;
pub use prometheus::{export_metrics, init_metrics};

pub use prometheus::{
    DATASTORE_UP, DISCOVERED_QUEUES, DISCOVERY_ATTEMPTS_TOTAL, PING_LATENCY, QUEUE_JOBS, REGISTRY,
};
