use tracing::instrument;

use crate::blob::BlobStore;
use crate::collection::Collection;
use crate::datastore::{CollectionKey, TaskStore};
use crate::error::Result;
use crate::task::{Task, TaskId};

/// The unordered general to-do list, persisted under `general-tasks`.
#[derive(Debug)]
pub struct GeneralList<B> {
    tasks: Collection<B>,
}

impl<B: BlobStore> GeneralList<B> {
    #[instrument(skip(blobs))]
    pub fn load(blobs: B) -> Self {
        Self {
            tasks: Collection::open(TaskStore::new(blobs), CollectionKey::General),
        }
    }

    /// Append a task; blank text fails with [`TaskError::EmptyText`](crate::error::TaskError::EmptyText)
    /// and leaves the list untouched.
    #[instrument(skip(self))]
    pub fn add(&mut self, text: &str) -> Result<Task> {
        self.tasks.append(text, None)
    }

    #[instrument(skip(self), fields(id = %id))]
    pub fn toggle(&mut self, id: &TaskId) -> Result<Task> {
        self.tasks.toggle(id)
    }

    /// Returns the removed task, or `None` when no task had this id.
    #[instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: &TaskId) -> Result<Option<Task>> {
        self.tasks.remove(id)
    }

    pub fn snapshot(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.find(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.tasks().is_empty()
    }
}
