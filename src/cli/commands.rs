//! CLI command definitions for queueboard.
//!
//! Dashboard settings come from flags with environment fallbacks; the
//! connection itself is always described by the environment (see
//! `ConnectionDescriptor::from_env`).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::connection::{env_snapshot, ConnectionDescriptor};
use crate::datastore::{spawn_error_logger, Datastore, RedisDatastore};
use crate::discovery::{
    JitterMode, JobCounts, QueueAdapter, QueueBoard, QueueFlavor, RetryPolicy, DEFAULT_PREFIX,
};
use crate::health::health_report;
use crate::metrics::{export_metrics, init_metrics, MetricsCollector};

/// Queue discovery and health for Bull/BullMQ dashboards.
#[derive(Parser)]
#[command(name = "queueboard")]
#[command(about = "Discover Bull/BullMQ queues in Redis and report their status")]
#[command(version)]
#[command(
    long_about = "queueboard finds the job queues stored in a Redis (or Sentinel-managed) datastore and reports their job counts and the datastore's health.\n\nConnection settings are read from REDIS_* and SENTINEL_* environment variables.\n\nExample usage:\n  REDIS_HOST=redis queueboard discover --prefix bull --json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Discover queues (retrying while Redis is not ready) and print their job counts.
    Discover(DiscoverArgs),

    /// Ping Redis once and print the health report.
    Health,

    /// Print the connection descriptor built from the environment, password redacted.
    Connection,
}

/// Discovery settings shared by commands that enumerate queues.
#[derive(clap::Args, Debug, Clone)]
pub struct DiscoveryArgs {
    /// Namespace prefix of the queue keys.
    #[arg(long, env = "BULL_PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Queue library that wrote the keys (BULLMQ or BULL).
    #[arg(long = "bull-version", env = "BULL_VERSION", default_value = "BULLMQ")]
    pub flavor: QueueFlavor,

    /// Delay before the second discovery attempt, in milliseconds.
    #[arg(long, env = "BACKOFF_STARTING_DELAY", default_value_t = 500)]
    pub starting_delay_ms: u64,

    /// Upper bound for any delay, in milliseconds (unbounded when unset).
    #[arg(long, env = "BACKOFF_MAX_DELAY")]
    pub max_delay_ms: Option<u64>,

    /// Growth factor between consecutive delays.
    #[arg(long, env = "BACKOFF_TIME_MULTIPLE", default_value_t = 2.0)]
    pub multiplier: f64,

    /// Number of discovery attempts, the first one included.
    #[arg(long, env = "BACKOFF_NB_ATTEMPTS", default_value_t = 10)]
    pub attempts: u32,

    /// Delay randomization (none or full).
    #[arg(long, env = "BACKOFF_JITTER", default_value = "none")]
    pub jitter: JitterMode,
}

impl DiscoveryArgs {
    /// Validated retry policy for these settings.
    pub fn retry_policy(&self) -> anyhow::Result<RetryPolicy> {
        let max_delay = self
            .max_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::MAX);
        let policy = RetryPolicy::new(
            Duration::from_millis(self.starting_delay_ms),
            max_delay,
            self.multiplier,
            self.attempts,
        )?;
        Ok(policy.with_jitter(self.jitter))
    }
}

/// Arguments for `queueboard discover`.
#[derive(Parser, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// Output JSON instead of a table.
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Append Prometheus metrics to the output.
    #[arg(long)]
    pub metrics: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Discover(args) => run_discover_command(args).await,
        Commands::Health => run_health_command().await,
        Commands::Connection => run_connection_command(),
    }
}

/// Builds the shared client and registers the error logger before any request.
fn connect_from_env() -> anyhow::Result<Arc<RedisDatastore>> {
    let descriptor = ConnectionDescriptor::from_env(&env_snapshot())?;
    let client = Arc::new(RedisDatastore::connect(descriptor)?);
    spawn_error_logger(client.errors());
    Ok(client)
}

// ============================================================================
// Discover
// ============================================================================

#[derive(Debug, Serialize)]
struct QueueSummary {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    counts: Option<JobCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiscoverOutput {
    prefix: String,
    flavor: QueueFlavor,
    discovered_at: String,
    queues: Vec<QueueSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn run_discover_command(args: DiscoverArgs) -> anyhow::Result<()> {
    if args.metrics {
        init_metrics()?;
    }

    let policy = args.discovery.retry_policy()?;
    let prefix = args.discovery.prefix.clone();
    let flavor = args.discovery.flavor;

    let client: Arc<dyn Datastore> = connect_from_env()?;
    info!(prefix = %prefix, flavor = %flavor, attempts = policy.max_attempts(), "Discovering queues");

    let board = QueueBoard::new();
    // Failure is logged by the board; the report below shows an empty list.
    let error = board
        .populate(&client, &prefix, flavor, &policy)
        .await
        .err()
        .map(|e| e.to_string());

    let queues = summarize(&board.queues().await).await;
    let output = DiscoverOutput {
        prefix,
        flavor,
        discovered_at: Utc::now().to_rfc3339(),
        queues,
        error,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_discover_table(&output);
    }

    if args.metrics {
        print!("{}", export_metrics());
    }

    Ok(())
}

async fn summarize(queues: &[QueueAdapter]) -> Vec<QueueSummary> {
    let metrics = MetricsCollector::new();
    let counts = futures::future::join_all(queues.iter().map(QueueAdapter::job_counts)).await;

    queues
        .iter()
        .zip(counts)
        .map(|(queue, result)| match result {
            Ok(counts) => {
                for (state, count) in counts.entries() {
                    metrics.record_queue_jobs(queue.name(), state, count);
                }
                QueueSummary {
                    name: queue.name().to_string(),
                    counts: Some(counts),
                    error: None,
                }
            }
            Err(err) => {
                warn!(queue = queue.name(), error = %err, "Failed to read job counts");
                QueueSummary {
                    name: queue.name().to_string(),
                    counts: None,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect()
}

fn print_discover_table(output: &DiscoverOutput) {
    if let Some(err) = &output.error {
        println!("No queues discovered under '{}': {}", output.prefix, err);
        return;
    }

    println!(
        "{} queue(s) under '{}' ({})",
        output.queues.len(),
        output.prefix,
        output.flavor
    );
    println!(
        "{:<32} {:>8} {:>8} {:>8} {:>10} {:>8} {:>8}",
        "QUEUE", "WAITING", "ACTIVE", "PAUSED", "COMPLETED", "FAILED", "DELAYED"
    );
    for queue in &output.queues {
        match (&queue.counts, &queue.error) {
            (Some(c), _) => println!(
                "{:<32} {:>8} {:>8} {:>8} {:>10} {:>8} {:>8}",
                queue.name, c.waiting, c.active, c.paused, c.completed, c.failed, c.delayed
            ),
            (None, Some(err)) => println!("{:<32} error: {}", queue.name, err),
            (None, None) => println!("{:<32} -", queue.name),
        }
    }
}

// ============================================================================
// Health / Connection
// ============================================================================

async fn run_health_command() -> anyhow::Result<()> {
    let client = connect_from_env()?;
    let report = health_report(client.as_ref()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_connection_command() -> anyhow::Result<()> {
    let descriptor = ConnectionDescriptor::from_env(&env_snapshot())?;
    println!("{}", serde_json::to_string_pretty(&descriptor.redacted())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_discover_with_all_options() {
        let args = vec![
            "queueboard",
            "discover",
            "--prefix",
            "custom-bull",
            "--bull-version",
            "BULL",
            "--starting-delay-ms",
            "100",
            "--max-delay-ms",
            "2000",
            "--multiplier",
            "3",
            "--attempts",
            "4",
            "--jitter",
            "full",
            "-j",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Discover(args) => {
                assert_eq!(args.discovery.prefix, "custom-bull");
                assert_eq!(args.discovery.flavor, QueueFlavor::Bull);
                assert_eq!(args.discovery.max_delay_ms, Some(2000));
                assert!(args.json);
                assert!(!args.metrics);

                let policy = args.discovery.retry_policy().expect("valid policy");
                assert_eq!(policy.max_attempts(), 4);
                assert_eq!(policy.jitter(), JitterMode::Full);
                assert_eq!(policy.delay_before(2), Duration::from_millis(100));
                assert_eq!(policy.delay_before(3), Duration::from_millis(300));
                assert_eq!(policy.delay_before(4), Duration::from_millis(900));
                assert_eq!(policy.delay_before(5), Duration::from_millis(2000));
            }
            _ => panic!("Expected Discover command"),
        }
    }

    #[test]
    fn test_invalid_flavor_rejected() {
        let args = vec!["queueboard", "discover", "--bull-version", "kue"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let args = vec!["queueboard", "discover", "--multiplier", "1", "--attempts", "3"];
        let cli = Cli::try_parse_from(args).expect("should parse");
        let Commands::Discover(args) = cli.command else {
            panic!("Expected Discover command");
        };
        assert!(args.discovery.retry_policy().is_err());
    }

    #[test]
    fn test_health_and_connection_parse() {
        let cli = Cli::try_parse_from(["queueboard", "health", "-l", "debug"]).expect("parse");
        assert!(matches!(cli.command, Commands::Health));
        assert_eq!(cli.log_level, "debug");

        let cli = Cli::try_parse_from(["queueboard", "connection"]).expect("parse");
        assert!(matches!(cli.command, Commands::Connection));
    }
}
