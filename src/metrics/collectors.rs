//! Recording helpers for queueboard metrics.
//!
//! `MetricsCollector` wraps the raw Prometheus statics so call sites never
//! deal with label ordering. Every method is a no-op until `init_metrics()`
//! has run, which keeps library callers and tests free of setup.

use super::prometheus::{
    DATASTORE_UP, DISCOVERED_QUEUES, DISCOVERY_ATTEMPTS_TOTAL, PING_LATENCY, QUEUE_JOBS,
};

/// Metrics collector for discovery and health signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    /// Record one discovery attempt.
    ///
    /// * `outcome` - "success" or the failing `DiscoveryError::kind()`
    /// * `queues` - number of queues found, for successful attempts
    pub fn record_discovery_attempt(&self, outcome: &str, queues: Option<usize>) {
        if let Some(attempts) = DISCOVERY_ATTEMPTS_TOTAL.get() {
            attempts.with_label_values(&[outcome]).inc();
        }

        if let (Some(gauge), Some(count)) = (DISCOVERED_QUEUES.get(), queues) {
            gauge.set(count as f64);
        }

        tracing::trace!(outcome, queues, "Recorded discovery metric");
    }

    /// Record a liveness probe and its latency.
    pub fn record_ping(&self, up: bool, latency_secs: f64) {
        if let Some(gauge) = DATASTORE_UP.get() {
            gauge.set(if up { 1.0 } else { 0.0 });
        }

        if let Some(latency) = PING_LATENCY.get() {
            let status = if up { "up" } else { "down" };
            latency.with_label_values(&[status]).observe(latency_secs);
        }
    }

    /// Record the job count of one queue state.
    pub fn record_queue_jobs(&self, queue: &str, state: &str, count: u64) {
        if let Some(gauge) = QUEUE_JOBS.get() {
            gauge.with_label_values(&[queue, state]).set(count as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{export_metrics, init_metrics};

    #[test]
    fn test_recording_shows_up_in_export() {
        let _ = init_metrics();
        let collector = MetricsCollector::new();

        collector.record_discovery_attempt("no_queues_found", None);
        collector.record_discovery_attempt("success", Some(2));
        collector.record_ping(true, 0.002);
        collector.record_queue_jobs("emails", "wait", 7);

        let metrics = export_metrics();
        assert!(metrics.contains("queueboard_discovery_attempts_total"));
        assert!(metrics.contains("outcome=\"no_queues_found\""));
        assert!(metrics.contains("queue=\"emails\""));
        assert!(metrics.contains("queueboard_datastore_up"));
    }
}
