//! Error types for task list and schedule operations.

use crate::task::TaskId;

/// Failure of a controller or store operation.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Task text was empty after trimming.
    #[error("please enter a valid task")]
    EmptyText,

    /// No task in the collection carries this id.
    #[error("no task with id {0}")]
    NotFound(TaskId),

    /// A stored blob exists but is not a valid task sequence.
    #[error("stored tasks under `{key}` are unreadable: {reason}")]
    Corrupt { key: String, reason: String },

    /// The blob store itself failed.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl TaskError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
