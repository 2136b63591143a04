//! A store wired to persistence
//!
//! [`BoardSession`] loads the board once when opened and saves it after every
//! mutation that changed it. Saving is best-effort: a failed write is logged
//! and remembered, but the in-memory change is kept.

use crate::{
    domain::{ColumnId, Snapshot, SortField, SortOrder, TaskDraft, TaskId, TaskUpdate},
    error::Result,
    persistence::PersistenceAdapter,
    storage::SlotStorage,
    store::{EntityStore, IdGenerator, Operation, Outcome, SubscriptionId},
};
use std::sync::Arc;
use tracing::error;

pub struct BoardSession<S> {
    store: EntityStore,
    adapter: PersistenceAdapter<S>,
    last_save_error: Option<String>,
}

impl<S: SlotStorage> BoardSession<S> {
    /// Loads the persisted board and opens a session on it
    pub async fn open(adapter: PersistenceAdapter<S>, ids: impl IdGenerator + 'static) -> Self {
        let snapshot = adapter.load().await;
        Self {
            store: EntityStore::new(snapshot, ids),
            adapter,
            last_save_error: None,
        }
    }

    pub fn state(&self) -> Arc<Snapshot> {
        self.store.state()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn adapter(&self) -> &PersistenceAdapter<S> {
        &self.adapter
    }

    /// Message of the most recent failed save, cleared by the next successful one
    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Applies an operation and saves the board if it changed
    pub async fn dispatch(&mut self, operation: Operation) -> Result<Outcome> {
        let outcome = self.store.dispatch(operation)?;
        if outcome.is_changed() {
            self.persist().await;
        }
        Ok(outcome)
    }

    /// Writes the current snapshot again, e.g. after an earlier failed save
    pub async fn save(&mut self) -> Result<()> {
        let result = self.adapter.save(&self.store.state()).await;
        self.record_save(&result);
        result
    }

    pub async fn add_task(&mut self, column_id: &ColumnId, draft: TaskDraft) -> Result<Option<TaskId>> {
        let id = self.store.add_task(column_id, draft)?;
        self.saved_if(id.is_some()).await;
        Ok(id)
    }

    pub async fn update_task(&mut self, task_id: &TaskId, update: TaskUpdate) -> Result<bool> {
        let changed = self.store.update_task(task_id, update)?;
        Ok(self.saved_if(changed).await)
    }

    pub async fn delete_task(&mut self, task_id: &TaskId) -> bool {
        let changed = self.store.delete_task(task_id);
        self.saved_if(changed).await
    }

    pub async fn add_column(&mut self, name: &str) -> Result<ColumnId> {
        let id = self.store.add_column(name)?;
        self.persist().await;
        Ok(id)
    }

    pub async fn update_column_name(&mut self, column_id: &ColumnId, name: &str) -> Result<bool> {
        let changed = self.store.update_column_name(column_id, name)?;
        Ok(self.saved_if(changed).await)
    }

    pub async fn delete_column(&mut self, column_id: &ColumnId) -> bool {
        let changed = self.store.delete_column(column_id);
        self.saved_if(changed).await
    }

    pub async fn update_board_name(&mut self, name: &str) -> Result<()> {
        let before = self.store.state();
        self.store.update_board_name(name)?;
        let changed = !Arc::ptr_eq(&before, &self.store.state());
        self.saved_if(changed).await;
        Ok(())
    }

    pub async fn reorder_columns(&mut self, order: Vec<ColumnId>) -> bool {
        let changed = self.store.reorder_columns(order);
        self.saved_if(changed).await
    }

    pub async fn reorder_tasks(&mut self, column_id: &ColumnId, order: Vec<TaskId>) -> bool {
        let changed = self.store.reorder_tasks(column_id, order);
        self.saved_if(changed).await
    }

    pub async fn move_column(&mut self, column_id: &ColumnId, to_index: usize) -> bool {
        let changed = self.store.move_column(column_id, to_index);
        self.saved_if(changed).await
    }

    pub async fn move_task(&mut self, task_id: &TaskId, to_index: usize) -> bool {
        let changed = self.store.move_task(task_id, to_index);
        self.saved_if(changed).await
    }

    pub async fn sort_column(&mut self, column_id: &ColumnId, field: SortField, order: SortOrder) -> bool {
        let changed = self.store.sort_column(column_id, field, order);
        self.saved_if(changed).await
    }

    async fn saved_if(&mut self, changed: bool) -> bool {
        if changed {
            self.persist().await;
        }
        changed
    }

    async fn persist(&mut self) {
        let result = self.adapter.save(&self.store.state()).await;
        self.record_save(&result);
    }

    fn record_save(&mut self, result: &Result<()>) {
        match result {
            Ok(()) => self.last_save_error = None,
            Err(e) => {
                error!(error = %e, "failed to save board, keeping in-memory state");
                self.last_save_error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::domain::Priority;
    use crate::error::TasklaneError;
    use crate::storage::memory_storage::MemoryStorage;
    use crate::store::SequentialGenerator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory storage whose writes can be switched off
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        failing: AtomicBool,
    }

    #[async_trait]
    impl SlotStorage for FlakyStorage {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(TasklaneError::StorageError("quota exceeded".to_string()));
            }
            self.inner.set(key, value).await
        }
    }

    async fn open<S: SlotStorage>(storage: S) -> BoardSession<S> {
        BoardSession::open(
            PersistenceAdapter::new(storage, StoreConfig::default()),
            SequentialGenerator::new(),
        )
        .await
    }

    #[tokio::test]
    async fn test_mutations_are_saved() {
        let mut session = open(MemoryStorage::new()).await;
        let c1 = session.add_column("To Do").await.unwrap();
        let t1 = session
            .add_task(&c1, TaskDraft::new("Write spec").with_priority(Priority::Medium))
            .await
            .unwrap()
            .unwrap();

        let reloaded = session.adapter().load().await;
        assert_eq!(reloaded, *session.state());
        assert!(reloaded.tasks.contains_key(&t1));
    }

    #[cfg(feature = "file-storage")]
    #[tokio::test]
    async fn test_reopen_continues_from_saved_board() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let storage = || crate::storage::file_storage::FileStorage::new(temp_dir.path());

        let mut first = open(storage()).await;
        let c1 = first.add_column("To Do").await.unwrap();
        first.add_task(&c1, TaskDraft::new("Persist me")).await.unwrap();
        first.update_board_name("Home").await.unwrap();
        let saved = first.state();

        let mut second = open(storage()).await;
        assert_eq!(*second.state(), *saved);

        let c2 = second.add_column("Done").await.unwrap();
        assert_ne!(c1, c2);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_mutation() {
        let mut session = open(FlakyStorage::default()).await;
        let c1 = session.add_column("To Do").await.unwrap();
        assert!(session.last_save_error().is_none());

        session.adapter().storage().failing.store(true, Ordering::SeqCst);
        let t1 = session
            .add_task(&c1, TaskDraft::new("Unsaved"))
            .await
            .unwrap()
            .unwrap();
        assert!(session.state().tasks.contains_key(&t1));
        assert!(session.last_save_error().unwrap().contains("quota exceeded"));

        let persisted = session.adapter().load().await;
        assert!(!persisted.tasks.contains_key(&t1));

        session.adapter().storage().failing.store(false, Ordering::SeqCst);
        session.save().await.unwrap();
        assert!(session.last_save_error().is_none());
        assert!(session.adapter().load().await.tasks.contains_key(&t1));
    }

    #[tokio::test]
    async fn test_noops_and_rejections_do_not_save() {
        let mut session = open(FlakyStorage::default()).await;
        session.adapter().storage().failing.store(true, Ordering::SeqCst);

        assert!(session.add_column("  ").await.is_err());
        assert!(!session.delete_task(&TaskId::new("missing")).await);
        assert!(session.last_save_error().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_are_notified_through_session() {
        let mut session = open(MemoryStorage::new()).await;
        let notified = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&notified);
        session.subscribe(move |_| flag.store(true, Ordering::SeqCst));

        session.add_column("To Do").await.unwrap();
        assert!(notified.load(Ordering::SeqCst));
    }
}
