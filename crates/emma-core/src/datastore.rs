use std::collections::HashSet;

use anyhow::Context;
use tracing::{debug, warn};

use crate::blob::BlobStore;
use crate::error::TaskError;
use crate::task::Task;

/// The two persisted task collections and their blob keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKey {
    General,
    Daily,
}

impl CollectionKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            CollectionKey::General => "general-tasks",
            CollectionKey::Daily => "daily-tasks",
        }
    }

    const fn requires_date(self) -> bool {
        matches!(self, CollectionKey::Daily)
    }
}

/// Serializes whole task collections to and from a [`BlobStore`].
#[derive(Debug, Clone)]
pub struct TaskStore<B> {
    blobs: B,
}

impl<B: BlobStore> TaskStore<B> {
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    /// Load a collection, falling back to an empty one when the blob is
    /// absent or unreadable.
    #[tracing::instrument(skip(self), fields(key = key.as_str()))]
    pub fn load(&self, key: CollectionKey) -> Vec<Task> {
        match self.try_load(key) {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "discarding unreadable task collection");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(skip(self), fields(key = key.as_str()))]
    pub fn try_load(&self, key: CollectionKey) -> Result<Vec<Task>, TaskError> {
        let raw = self
            .blobs
            .get(key.as_str())
            .with_context(|| format!("failed to load {}", key.as_str()))?;

        let Some(raw) = raw else {
            debug!("no stored collection, starting empty");
            return Ok(Vec::new());
        };

        let tasks = parse_collection(key, &raw)?;
        debug!(count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, tasks), fields(key = key.as_str(), count = tasks.len()))]
    pub fn save(&self, key: CollectionKey, tasks: &[Task]) -> Result<(), TaskError> {
        let serialized = serde_json::to_string(tasks)
            .with_context(|| format!("failed to serialize {}", key.as_str()))?;
        self.blobs
            .set(key.as_str(), &serialized)
            .with_context(|| format!("failed to save {}", key.as_str()))?;
        debug!("saved tasks");
        Ok(())
    }
}

fn parse_collection(key: CollectionKey, raw: &str) -> Result<Vec<Task>, TaskError> {
    let corrupt = |reason: String| TaskError::Corrupt {
        key: key.as_str().to_string(),
        reason,
    };

    let tasks: Vec<Task> = serde_json::from_str(raw).map_err(|err| corrupt(err.to_string()))?;

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        if !seen.insert(task.id()) {
            return Err(corrupt(format!("duplicate task id {}", task.id())));
        }
        if key.requires_date() && task.date().is_none() {
            return Err(corrupt(format!("task {} has no date", task.id())));
        }
    }

    Ok(tasks)
}
