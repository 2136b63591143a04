//! The entity store
//!
//! [`EntityStore`] owns the current [`Snapshot`] and is the only write path to
//! it. Each operation computes a whole new snapshot through
//! [`operation::apply`]; the store then swaps it in and notifies subscribers.
//! Stale ids degrade to no-ops, blank names are rejected with an error.

pub mod id_generator;
pub mod operation;

pub use id_generator::{IdGenerator, SequentialGenerator, UuidGenerator};
pub use operation::{Operation, Outcome, Transition};

use crate::config::StoreConfig;
use crate::domain::{ColumnId, Snapshot, SortField, SortOrder, TaskDraft, TaskId, TaskUpdate};
use crate::error::{EntityKind, Result, TasklaneError};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handle returned by [`EntityStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

/// Explicit state container for one board
pub struct EntityStore {
    state: Arc<Snapshot>,
    ids: Box<dyn IdGenerator>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EntityStore {
    /// Creates a store holding `snapshot`, generating ids with `ids`
    ///
    /// The generator observes every id already in `snapshot` first.
    pub fn new(snapshot: Snapshot, mut ids: impl IdGenerator + 'static) -> Self {
        ids.observe(EntityKind::Board, snapshot.board.id.as_str());
        for id in snapshot.columns.keys() {
            ids.observe(EntityKind::Column, id.as_str());
        }
        for id in snapshot.tasks.keys() {
            ids.observe(EntityKind::Task, id.as_str());
        }

        Self {
            state: Arc::new(snapshot),
            ids: Box::new(ids),
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }

    /// Creates a store with an empty default board and UUID ids
    pub fn with_defaults(config: &StoreConfig) -> Self {
        Self::new(Snapshot::initial(config), UuidGenerator)
    }

    /// Returns the committed snapshot
    pub fn state(&self) -> Arc<Snapshot> {
        Arc::clone(&self.state)
    }

    /// Applies an operation and commits the resulting snapshot
    pub fn dispatch(&mut self, operation: Operation) -> Result<Outcome> {
        let name = operation.name();
        match operation::apply(&self.state, operation, self.ids.as_mut(), Utc::now())? {
            Transition::Unchanged => {
                debug!(operation = name, "operation left the board unchanged");
                Ok(Outcome::Unchanged)
            }
            Transition::Changed(next, outcome) => {
                debug!(operation = name, outcome = ?outcome, "operation committed");
                self.commit(next);
                Ok(outcome)
            }
        }
    }

    /// Registers a listener called with every newly committed snapshot
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Adds a task at the end of a column
    ///
    /// Returns `Ok(None)` when the column does not exist.
    pub fn add_task(&mut self, column_id: &ColumnId, draft: TaskDraft) -> Result<Option<TaskId>> {
        let outcome = self.dispatch(Operation::AddTask {
            column_id: column_id.clone(),
            draft,
        })?;
        Ok(match outcome {
            Outcome::TaskCreated(id) => Some(id),
            _ => None,
        })
    }

    /// Merges the provided fields into a task; returns whether anything changed
    pub fn update_task(&mut self, task_id: &TaskId, update: TaskUpdate) -> Result<bool> {
        self.dispatch(Operation::UpdateTask {
            task_id: task_id.clone(),
            update,
        })
        .map(|outcome| outcome.is_changed())
    }

    /// Deletes a task and strips it from every column
    pub fn delete_task(&mut self, task_id: &TaskId) -> bool {
        self.infallible(Operation::DeleteTask {
            task_id: task_id.clone(),
        })
    }

    /// Appends a new, empty column
    pub fn add_column(&mut self, name: &str) -> Result<ColumnId> {
        let outcome = self.dispatch(Operation::AddColumn {
            name: name.to_string(),
        })?;
        let Outcome::ColumnCreated(id) = outcome else {
            return Err(TasklaneError::Other(format!(
                "adding column produced {:?}",
                outcome
            )));
        };
        Ok(id)
    }

    pub fn update_column_name(&mut self, column_id: &ColumnId, name: &str) -> Result<bool> {
        self.dispatch(Operation::UpdateColumnName {
            column_id: column_id.clone(),
            name: name.to_string(),
        })
        .map(|outcome| outcome.is_changed())
    }

    /// Deletes a column together with every task it lists
    pub fn delete_column(&mut self, column_id: &ColumnId) -> bool {
        self.infallible(Operation::DeleteColumn {
            column_id: column_id.clone(),
        })
    }

    pub fn update_board_name(&mut self, name: &str) -> Result<()> {
        self.dispatch(Operation::UpdateBoardName {
            name: name.to_string(),
        })
        .map(|_| ())
    }

    /// Replaces the column order with a permutation of it
    pub fn reorder_columns(&mut self, order: Vec<ColumnId>) -> bool {
        self.infallible(Operation::ReorderColumns { order })
    }

    /// Replaces a column's task order with a permutation of it
    pub fn reorder_tasks(&mut self, column_id: &ColumnId, order: Vec<TaskId>) -> bool {
        self.infallible(Operation::ReorderTasks {
            column_id: column_id.clone(),
            order,
        })
    }

    pub fn move_column(&mut self, column_id: &ColumnId, to_index: usize) -> bool {
        self.infallible(Operation::MoveColumn {
            column_id: column_id.clone(),
            to_index,
        })
    }

    /// Moves a task within its own column
    pub fn move_task(&mut self, task_id: &TaskId, to_index: usize) -> bool {
        self.infallible(Operation::MoveTask {
            task_id: task_id.clone(),
            to_index,
        })
    }

    pub fn sort_column(&mut self, column_id: &ColumnId, field: SortField, order: SortOrder) -> bool {
        self.infallible(Operation::SortColumn {
            column_id: column_id.clone(),
            field,
            order,
        })
    }

    /// Dispatches an operation that takes no names and creates no ids
    fn infallible(&mut self, operation: Operation) -> bool {
        let name = operation.name();
        match self.dispatch(operation) {
            Ok(outcome) => outcome.is_changed(),
            Err(e) => {
                debug!(operation = name, error = %e, "operation rejected");
                false
            }
        }
    }

    fn commit(&mut self, next: Snapshot) {
        self.state = Arc::new(next);
        for (_, listener) in &self.listeners {
            listener(&self.state);
        }
    }
}
