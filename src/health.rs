//! Datastore liveness probe and the health report built on it.
//!
//! The probe pings once and never retries; callers decide how often to ask.
//! The report is always meant to be served with HTTP 200: its `status`
//! field carries the real signal.

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::datastore::Datastore;
use crate::metrics::MetricsCollector;

/// Description attached to every liveness result.
pub const REDIS_CHECK_DESCRIPTION: &str = "Based on the Redis PING response";

/// State of one checked component. A failed check has no status at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
}

/// Outcome of one liveness probe.
///
/// On failure `status` is absent and `error` holds the cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LivenessStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ComponentStatus>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LivenessStatus {
    pub fn is_up(&self) -> bool {
        self.status == Some(ComponentStatus::Up)
    }
}

/// Overall health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthInfo {
    pub redis: LivenessStatus,
}

/// Body of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub info: HealthInfo,
}

impl HealthReport {
    /// HTTP status to serve the report with, whatever its content.
    pub fn http_status(&self) -> u16 {
        200
    }
}

/// Pings the datastore once.
pub async fn check_liveness(client: &dyn Datastore) -> LivenessStatus {
    let started = Instant::now();
    let result = client.ping().await;
    let latency = started.elapsed().as_secs_f64();

    let status = match result {
        Ok(reply) => {
            debug!(reply = %reply, latency_secs = latency, "Redis ping succeeded");
            LivenessStatus {
                status: Some(ComponentStatus::Up),
                description: REDIS_CHECK_DESCRIPTION.to_string(),
                error: None,
            }
        }
        Err(err) => {
            debug!(error = %err, latency_secs = latency, "Redis ping failed");
            LivenessStatus {
                status: None,
                description: REDIS_CHECK_DESCRIPTION.to_string(),
                error: Some(err.to_string()),
            }
        }
    };

    MetricsCollector::new().record_ping(status.is_up(), latency);
    status
}

/// Runs the liveness probe and wraps it in a health report.
pub async fn health_report(client: &dyn Datastore) -> HealthReport {
    let redis = check_liveness(client).await;
    let status = if redis.is_up() {
        OverallStatus::Ok
    } else {
        OverallStatus::Error
    };

    HealthReport {
        status,
        info: HealthInfo { redis },
    }
}
