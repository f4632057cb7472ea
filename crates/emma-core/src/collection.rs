use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::datastore::{CollectionKey, TaskStore};
use crate::error::{Result, TaskError};
use crate::task::{DateId, Task, TaskId, fresh_id, normalize_text};

/// An ordered task collection bound to its blob key.
///
/// Every mutation is persisted before it returns. When the save fails the
/// in-memory change is undone, so memory never runs ahead of storage.
#[derive(Debug)]
pub(crate) struct Collection<B> {
    store: TaskStore<B>,
    key: CollectionKey,
    tasks: Vec<Task>,
}

impl<B: BlobStore> Collection<B> {
    pub(crate) fn open(store: TaskStore<B>, key: CollectionKey) -> Self {
        let tasks = store.load(key);
        info!(key = key.as_str(), count = tasks.len(), "loaded task collection");
        Self { store, key, tasks }
    }

    pub(crate) fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub(crate) fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    pub(crate) fn append(&mut self, text: &str, date: Option<DateId>) -> Result<Task> {
        let text = normalize_text(text)?;
        let task = Task::create(fresh_id(&self.tasks), text, date);

        self.tasks.push(task.clone());
        if let Err(err) = self.persist() {
            self.tasks.pop();
            return Err(err);
        }

        debug!(key = self.key.as_str(), id = %task.id(), "added task");
        Ok(task)
    }

    pub(crate) fn toggle(&mut self, id: &TaskId) -> Result<Task> {
        let idx = self
            .position(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;

        self.tasks[idx].toggle();
        if let Err(err) = self.persist() {
            self.tasks[idx].toggle();
            return Err(err);
        }

        let task = self.tasks[idx].clone();
        debug!(key = self.key.as_str(), id = %id, completed = task.completed(), "toggled task");
        Ok(task)
    }

    pub(crate) fn remove(&mut self, id: &TaskId) -> Result<Option<Task>> {
        let Some(idx) = self.position(id) else {
            debug!(key = self.key.as_str(), id = %id, "remove of unknown task ignored");
            return Ok(None);
        };

        let task = self.tasks.remove(idx);
        if let Err(err) = self.persist() {
            self.tasks.insert(idx, task);
            return Err(err);
        }

        debug!(key = self.key.as_str(), id = %id, "removed task");
        Ok(Some(task))
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id() == id)
    }

    fn persist(&self) -> Result<()> {
        self.store.save(self.key, &self.tasks).inspect_err(|err| {
            warn!(key = self.key.as_str(), error = %err, "failed to persist; change rolled back");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::anyhow;

    use super::*;
    use crate::blob::MemoryBlobStore;

    /// Fails every write once `fail` is set.
    #[derive(Default)]
    struct FlakyBlobs {
        inner: MemoryBlobStore,
        fail: Cell<bool>,
    }

    impl BlobStore for FlakyBlobs {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.fail.get() {
                return Err(anyhow!("disk full"));
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn failed_save_rolls_back_every_mutation() {
        let blobs = FlakyBlobs::default();
        let mut tasks = Collection::open(TaskStore::new(&blobs), CollectionKey::General);
        let kept = tasks.append("Buy milk", None).expect("add");

        blobs.fail.set(true);

        assert!(matches!(
            tasks.append("Walk dog", None),
            Err(TaskError::Storage(_))
        ));
        assert!(tasks.toggle(kept.id()).is_err());
        assert!(tasks.remove(kept.id()).is_err());

        assert_eq!(tasks.tasks(), std::slice::from_ref(&kept));
        assert_eq!(
            TaskStore::new(&blobs.inner).load(CollectionKey::General),
            vec![kept]
        );
    }

    #[test]
    fn remove_of_unknown_id_does_not_write() {
        let blobs = FlakyBlobs::default();
        let mut tasks = Collection::open(TaskStore::new(&blobs), CollectionKey::General);
        blobs.fail.set(true);

        assert!(matches!(tasks.remove(&TaskId::new("ghost")), Ok(None)));
        assert!(!blobs.inner.contains("general-tasks"));
    }
}
