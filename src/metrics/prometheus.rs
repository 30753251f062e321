//! Prometheus metrics registration and export.
//!
//! This module defines the Prometheus metrics used by queueboard and provides
//! functions for initializing, registering, and exporting them.

use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all queueboard metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Discovery attempts, labeled by outcome (success, no_queues_found, connection_error).
pub static DISCOVERY_ATTEMPTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Number of queues found by the last successful discovery.
pub static DISCOVERED_QUEUES: OnceLock<Gauge> = OnceLock::new();

/// 1 when the last liveness probe succeeded, 0 otherwise.
pub static DATASTORE_UP: OnceLock<Gauge> = OnceLock::new();

/// Liveness probe latency in seconds, labeled by status.
pub static PING_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Jobs per queue and state.
pub static QUEUE_JOBS: OnceLock<GaugeVec> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Call once at startup. Later calls are harmless: the first registry wins.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric construction or registration fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    let discovery_attempts = CounterVec::new(
        Opts::new(
            "queueboard_discovery_attempts_total",
            "Queue discovery attempts by outcome",
        ),
        &["outcome"],
    )?;

    let discovered_queues = Gauge::new(
        "queueboard_discovered_queues",
        "Number of queues found by the last successful discovery",
    )?;

    let datastore_up = Gauge::new(
        "queueboard_datastore_up",
        "Whether the last datastore liveness probe succeeded",
    )?;

    let ping_latency = HistogramVec::new(
        HistogramOpts::new(
            "queueboard_ping_latency_seconds",
            "Datastore liveness probe latency in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["status"],
    )?;

    let queue_jobs = GaugeVec::new(
        Opts::new("queueboard_queue_jobs", "Jobs per queue and state"),
        &["queue", "state"],
    )?;

    registry.register(Box::new(discovery_attempts.clone()))?;
    registry.register(Box::new(discovered_queues.clone()))?;
    registry.register(Box::new(datastore_up.clone()))?;
    registry.register(Box::new(ping_latency.clone()))?;
    registry.register(Box::new(queue_jobs.clone()))?;

    // Already-set cells mean a previous call won; keep its metrics.
    let _ = REGISTRY.set(registry);
    let _ = DISCOVERY_ATTEMPTS_TOTAL.set(discovery_attempts);
    let _ = DISCOVERED_QUEUES.set(discovered_queues);
    let _ = DATASTORE_UP.set(datastore_up);
    let _ = PING_LATENCY.set(ping_latency);
    let _ = QUEUE_JOBS.set(queue_jobs);

    tracing::debug!("Prometheus metrics initialized");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
///
/// Returns an explanatory comment line when metrics were never initialized
/// or encoding fails.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(REGISTRY.get().is_some());
    }

    #[test]
    fn test_export_after_init_has_no_error_prefix() {
        let _ = init_metrics();

        if let Some(gauge) = DISCOVERED_QUEUES.get() {
            gauge.set(3.0);
        }

        let metrics = export_metrics();
        assert!(!metrics.starts_with("# Error"));
        assert!(metrics.contains("queueboard_discovered_queues"));
    }
}
