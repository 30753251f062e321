//! Queue discovery with startup resilience.
//!
//! - **service**: one-shot enumeration of the queues under a namespace prefix
//! - **retry**: bounded exponential backoff around the one-shot call
//! - **queue**: per-queue adapters sharing the datastore client
//! - **board**: the live queue list the dashboard reads
//!
//! # Example
//!
//! ```rust,ignore
//! use queueboard::discovery::{QueueBoard, QueueFlavor, RetryPolicy};
//!
//! let board = QueueBoard::new();
//! board
//!     .populate(&client, "bull", QueueFlavor::BullMq, &RetryPolicy::default())
//!     .await;
//! for queue in board.queues().await {
//!     println!("{}", queue.name());
//! }
//! ```

pub mod board;
pub mod queue;
pub mod retry;
pub mod service;

pub use board::QueueBoard;
pub use queue::{JobCounts, JobState, QueueAdapter, QueueFlavor};
pub use retry::{discover_with_retry, JitterMode, RetryPolicy};
pub use service::{discover_queues, queue_identifier, queue_names, DEFAULT_PREFIX};
