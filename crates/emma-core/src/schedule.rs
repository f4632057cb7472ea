use chrono::NaiveDate;
use tracing::instrument;

use crate::blob::BlobStore;
use crate::collection::Collection;
use crate::datastore::{CollectionKey, TaskStore};
use crate::datetime::{DayBucket, current_week};
use crate::error::Result;
use crate::task::{DateId, Task, TaskId};

/// Date-keyed tasks behind the rolling 7-day schedule, persisted under
/// `daily-tasks`.
///
/// Tasks are bucketed by exact `date` equality with a linear scan; no index
/// is kept. The clock is never read here: callers pass the reference day.
#[derive(Debug)]
pub struct Schedule<B> {
    tasks: Collection<B>,
}

impl<B: BlobStore> Schedule<B> {
    #[instrument(skip(blobs))]
    pub fn load(blobs: B) -> Self {
        Self {
            tasks: Collection::open(TaskStore::new(blobs), CollectionKey::Daily),
        }
    }

    pub fn current_week(&self, reference: NaiveDate) -> Vec<DayBucket> {
        current_week(reference)
    }

    /// Add a task for `date`. The date is not checked against the current
    /// week.
    #[instrument(skip(self, date), fields(date = tracing::field::Empty))]
    pub fn add(&mut self, date: impl Into<DateId>, text: &str) -> Result<Task> {
        let date = date.into();
        tracing::Span::current().record("date", date.as_str());
        self.tasks.append(text, Some(date))
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn toggle(&mut self, id: &TaskId) -> Result<Task> {
        self.tasks.toggle(id)
    }

    /// Returns the removed task, whose date names the day to redraw, or
    /// `None` when no task had this id.
    #[instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: &TaskId) -> Result<Option<Task>> {
        self.tasks.remove(id)
    }

    pub fn tasks_for(&self, date: &DateId) -> Vec<&Task> {
        self.tasks
            .tasks()
            .iter()
            .filter(|task| task.date() == Some(date))
            .collect()
    }

    pub fn week_view(&self, reference: NaiveDate) -> Vec<(DayBucket, Vec<&Task>)> {
        current_week(reference)
            .into_iter()
            .map(|bucket| {
                let tasks = self.tasks_for(&bucket.date_id);
                (bucket, tasks)
            })
            .collect()
    }

    /// Distinct dates present, in first-seen order.
    pub fn dates(&self) -> Vec<&DateId> {
        let mut out: Vec<&DateId> = Vec::new();
        for date in self.tasks.tasks().iter().filter_map(Task::date) {
            if !out.contains(&date) {
                out.push(date);
            }
        }
        out
    }

    pub fn snapshot(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.find(id)
    }
}
