//! Bounded exponential backoff and the resilient discovery loop.
//!
//! The delay before attempt `n` (n >= 2) is
//! `min(max_delay, starting_delay * multiplier^(n-2))`, optionally jittered.
//! Every failure is retried the same way; only the final error tells the
//! caller what went wrong.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::datastore::Datastore;
use crate::error::{ConfigError, DiscoveryError};
use crate::metrics::MetricsCollector;

use super::queue::{QueueAdapter, QueueFlavor};
use super::service::discover_queues;

/// Default delay before the second attempt.
pub const DEFAULT_STARTING_DELAY: Duration = Duration::from_millis(500);

/// Default growth factor between delays.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Default number of attempts, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// How delays are randomized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterMode {
    /// Deterministic delays.
    #[default]
    None,
    /// Uniformly drawn from `[0, delay]`.
    Full,
}

impl FromStr for JitterMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "full" => Ok(Self::Full),
            other => Err(ConfigError::invalid(
                "BACKOFF_JITTER",
                format!("unknown jitter mode '{}', expected none or full", other),
            )),
        }
    }
}

/// Retry schedule for an operation that may fail transiently.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    starting_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    max_attempts: u32,
    jitter: JitterMode,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            starting_delay: DEFAULT_STARTING_DELAY,
            max_delay: Duration::MAX,
            multiplier: DEFAULT_MULTIPLIER,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            jitter: JitterMode::None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy without jitter.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidConfiguration` if `multiplier <= 1` (or is not
    /// finite) or `max_attempts == 0`.
    pub fn new(
        starting_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        max_attempts: u32,
    ) -> Result<Self, ConfigError> {
        if !multiplier.is_finite() || multiplier <= 1.0 {
            return Err(ConfigError::invalid(
                "BACKOFF_TIME_MULTIPLE",
                format!("multiplier must be greater than 1, got {}", multiplier),
            ));
        }
        if max_attempts == 0 {
            return Err(ConfigError::invalid(
                "BACKOFF_NB_ATTEMPTS",
                "at least one attempt is required",
            ));
        }

        Ok(Self {
            starting_delay,
            max_delay,
            multiplier,
            max_attempts,
            jitter: JitterMode::None,
        })
    }

    pub fn with_jitter(mut self, jitter: JitterMode) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn jitter(&self) -> JitterMode {
        self.jitter
    }

    /// Un-jittered delay before `attempt` (1-based). Zero for the first.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let nanos = self.starting_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        let cap = self.max_delay.as_nanos() as f64;

        if !nanos.is_finite() || nanos >= cap || nanos >= u64::MAX as f64 {
            let capped = Duration::from_nanos(u64::MAX);
            return self.max_delay.min(capped);
        }
        Duration::from_nanos(nanos.round() as u64)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        match self.jitter {
            JitterMode::None => delay,
            JitterMode::Full => {
                use rand::RngExt;

                let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
                Duration::from_nanos(rand::rng().random_range(0..=nanos))
            }
        }
    }

    /// Runs `operation` until it succeeds or attempts are exhausted.
    ///
    /// The closure receives the 1-based attempt number. The error of the
    /// last attempt is returned on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Giving up after final attempt"
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.jittered(self.delay_before(attempt + 1));
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Discovers queues, retrying per `policy` while the datastore is not ready
/// or holds no queue yet.
pub async fn discover_with_retry(
    client: &Arc<dyn Datastore>,
    prefix: &str,
    flavor: QueueFlavor,
    policy: &RetryPolicy,
) -> Result<Vec<QueueAdapter>, DiscoveryError> {
    let metrics = MetricsCollector::new();

    let queues = policy
        .run(|attempt| async move {
            let result = discover_queues(client, prefix, flavor).await;
            match &result {
                Ok(queues) => metrics.record_discovery_attempt("success", Some(queues.len())),
                Err(err) => metrics.record_discovery_attempt(err.kind(), None),
            }
            if let Err(err) = &result {
                tracing::debug!(attempt, kind = err.kind(), "Discovery attempt failed");
            }
            result
        })
        .await?;

    info!(prefix, queues = queues.len(), "Queue discovery complete");
    Ok(queues)
}
