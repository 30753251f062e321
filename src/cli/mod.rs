//! Command-line interface for queueboard.
//!
//! Provides commands for queue discovery, health checks and inspecting the
//! connection settings read from the environment.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
