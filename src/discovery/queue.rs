//! Per-queue adapters handed to the dashboard.
//!
//! An adapter is a thin read-only view of one queue. Every adapter shares
//! the process-wide datastore client; none opens its own connection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::datastore::Datastore;
use crate::error::{ConfigError, DatastoreError};

/// Which queue library wrote the keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueueFlavor {
    #[default]
    BullMq,
    Bull,
}

impl QueueFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BullMq => "BULLMQ",
            Self::Bull => "BULL",
        }
    }

    /// Sorted-set states the flavor keeps on top of the common ones.
    fn extra_sorted_sets(&self) -> &'static [JobState] {
        match self {
            Self::BullMq => &[JobState::Prioritized, JobState::WaitingChildren],
            Self::Bull => &[],
        }
    }
}

impl fmt::Display for QueueFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueFlavor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BULLMQ" => Ok(Self::BullMq),
            "BULL" => Ok(Self::Bull),
            other => Err(ConfigError::invalid(
                "BULL_VERSION",
                format!("unknown queue library '{}', expected BULLMQ or BULL", other),
            )),
        }
    }
}

/// Job states readable from a queue's keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Waiting,
    Active,
    Paused,
    Completed,
    Failed,
    Delayed,
    Prioritized,
    WaitingChildren,
}

impl JobState {
    /// Key suffix under `<prefix>:<queue>:`.
    pub fn key_suffix(&self) -> &'static str {
        match self {
            Self::Waiting => "wait",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Delayed => "delayed",
            Self::Prioritized => "prioritized",
            Self::WaitingChildren => "waiting-children",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Delayed => "delayed",
            Self::Prioritized => "prioritized",
            Self::WaitingChildren => "waiting_children",
        }
    }
}

const LIST_STATES: [JobState; 3] = [JobState::Waiting, JobState::Active, JobState::Paused];
const SORTED_SET_STATES: [JobState; 3] =
    [JobState::Completed, JobState::Failed, JobState::Delayed];

/// Job counts of one queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub waiting: u64,
    pub active: u64,
    pub paused: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    /// BullMQ only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioritized: Option<u64>,
    /// BullMQ only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_children: Option<u64>,
}

impl JobCounts {
    fn set(&mut self, state: JobState, count: u64) {
        match state {
            JobState::Waiting => self.waiting = count,
            JobState::Active => self.active = count,
            JobState::Paused => self.paused = count,
            JobState::Completed => self.completed = count,
            JobState::Failed => self.failed = count,
            JobState::Delayed => self.delayed = count,
            JobState::Prioritized => self.prioritized = Some(count),
            JobState::WaitingChildren => self.waiting_children = Some(count),
        }
    }

    /// `(state label, count)` pairs for every state present.
    pub fn entries(&self) -> Vec<(&'static str, u64)> {
        let mut entries = vec![
            (JobState::Waiting.label(), self.waiting),
            (JobState::Active.label(), self.active),
            (JobState::Paused.label(), self.paused),
            (JobState::Completed.label(), self.completed),
            (JobState::Failed.label(), self.failed),
            (JobState::Delayed.label(), self.delayed),
        ];
        if let Some(count) = self.prioritized {
            entries.push((JobState::Prioritized.label(), count));
        }
        if let Some(count) = self.waiting_children {
            entries.push((JobState::WaitingChildren.label(), count));
        }
        entries
    }

    pub fn total(&self) -> u64 {
        self.entries().iter().map(|(_, count)| count).sum()
    }
}

/// Read-only view of one discovered queue.
#[derive(Clone)]
pub struct QueueAdapter {
    name: String,
    prefix: String,
    flavor: QueueFlavor,
    client: Arc<dyn Datastore>,
}

impl fmt::Debug for QueueAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueAdapter")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("flavor", &self.flavor)
            .finish_non_exhaustive()
    }
}

impl QueueAdapter {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        flavor: QueueFlavor,
        client: Arc<dyn Datastore>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            flavor,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flavor(&self) -> QueueFlavor {
        self.flavor
    }

    /// The datastore client this adapter reads through.
    pub fn client(&self) -> &Arc<dyn Datastore> {
        &self.client
    }

    /// Full key of one of this queue's structures.
    pub fn key(&self, suffix: &str) -> String {
        format!("{}:{}:{}", self.prefix, self.name, suffix)
    }

    /// Reads the size of every state structure of the queue.
    pub async fn job_counts(&self) -> Result<JobCounts, DatastoreError> {
        let lists = LIST_STATES.iter().map(|state| async move {
            let count = self.client.list_len(&self.key(state.key_suffix())).await?;
            Ok::<_, DatastoreError>((*state, count))
        });
        let sets = SORTED_SET_STATES
            .iter()
            .chain(self.flavor.extra_sorted_sets())
            .map(|state| async move {
                let count = self
                    .client
                    .sorted_set_len(&self.key(state.key_suffix()))
                    .await?;
                Ok::<_, DatastoreError>((*state, count))
            });

        let (lists, sets) = futures::try_join!(
            futures::future::try_join_all(lists),
            futures::future::try_join_all(sets)
        )?;

        let mut counts = JobCounts::default();
        for (state, count) in lists.into_iter().chain(sets) {
            counts.set(state, count);
        }
        Ok(counts)
    }
}
