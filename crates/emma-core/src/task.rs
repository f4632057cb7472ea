use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

pub const DATE_ID_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Calendar-day key of a scheduled task, canonically `YYYY-MM-DD`.
///
/// Any string is accepted; only [`DateId::from`] a `NaiveDate` guarantees the
/// canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateId(String);

impl DateId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, DATE_ID_FORMAT).ok()
    }
}

impl From<NaiveDate> for DateId {
    fn from(date: NaiveDate) -> Self {
        Self(date.format(DATE_ID_FORMAT).to_string())
    }
}

impl From<&str> for DateId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for DateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    text: String,
    completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<DateId>,
}

impl Task {
    /// Rebuild a task from stored fields. New tasks come from the controllers' `add`.
    pub fn from_parts(id: TaskId, text: String, completed: bool, date: Option<DateId>) -> Self {
        Self {
            id,
            text,
            completed,
            date,
        }
    }

    pub(crate) fn create(id: TaskId, text: String, date: Option<DateId>) -> Self {
        Self::from_parts(id, text, false, date)
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn date(&self) -> Option<&DateId> {
        self.date.as_ref()
    }

    pub(crate) fn toggle(&mut self) {
        self.completed = !self.completed;
    }
}

/// Trim user input, rejecting text that is empty afterwards.
pub fn normalize_text(raw: &str) -> Result<String, TaskError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyText);
    }
    Ok(trimmed.to_string())
}

/// Pick an id no task in `existing` uses yet.
pub(crate) fn fresh_id(existing: &[Task]) -> TaskId {
    loop {
        let candidate = TaskId::random();
        if !existing.iter().any(|task| task.id == candidate) {
            return candidate;
        }
    }
}
