//! The normalized board state
//!
//! A [`Snapshot`] holds the board, the column map and the task map. Relationships
//! are expressed only through id lists (`Board::column_order`, `Column::task_ids`),
//! so each entity is stored exactly once.

use crate::config::StoreConfig;
use crate::domain::{
    board::{Board, Column},
    ids::{BoardId, ColumnId, TaskId},
    task::Task,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Immutable value representing the whole store at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub board: Board,
    #[serde(default)]
    pub columns: BTreeMap<ColumnId, Column>,
    #[serde(default)]
    pub tasks: BTreeMap<TaskId, Task>,
}

/// A breach of the referential invariants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// `column_order` names a column that is not in the column map
    DanglingColumn(ColumnId),
    /// A column exists in the map but not in `column_order`
    OrphanColumn(ColumnId),
    /// A column appears more than once in `column_order`
    DuplicateColumn(ColumnId),
    /// A column's map key differs from its `id` field
    MismatchedColumnKey(ColumnId),
    /// A column lists a task that is not in the task map
    DanglingTask { column: ColumnId, task: TaskId },
    /// A task is listed more than once, by one or several columns
    DuplicateTask { column: ColumnId, task: TaskId },
    /// A task's map key differs from its `id` field
    MismatchedTaskKey(TaskId),
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingColumn(id) => write!(f, "column order references missing column {}", id),
            Self::OrphanColumn(id) => write!(f, "column {} is missing from the column order", id),
            Self::DuplicateColumn(id) => write!(f, "column {} appears twice in the column order", id),
            Self::MismatchedColumnKey(id) => write!(f, "column stored under key {} has another id", id),
            Self::DanglingTask { column, task } => {
                write!(f, "column {} references missing task {}", column, task)
            }
            Self::DuplicateTask { column, task } => {
                write!(f, "column {} lists task {} already listed elsewhere", column, task)
            }
            Self::MismatchedTaskKey(id) => write!(f, "task stored under key {} has another id", id),
        }
    }
}

impl Snapshot {
    /// Creates an empty snapshot holding only the board
    pub fn new(board: Board) -> Self {
        Self {
            board,
            columns: BTreeMap::new(),
            tasks: BTreeMap::new(),
        }
    }

    /// Initial state used when nothing has been persisted yet
    pub fn initial(config: &StoreConfig) -> Self {
        Self::new(Board::new(
            BoardId::new(config.board_id.clone()),
            config.board_name.clone(),
        ))
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.get(id)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Columns in display order
    pub fn ordered_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.board
            .column_order
            .iter()
            .filter_map(|id| self.columns.get(id))
    }

    /// Tasks of a column in display order
    pub fn tasks_in(&self, column_id: &ColumnId) -> Vec<&Task> {
        self.columns
            .get(column_id)
            .map(|column| {
                column
                    .task_ids
                    .iter()
                    .filter_map(|id| self.tasks.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Finds the column listing a task, scanning in display order
    pub fn column_of(&self, task_id: &TaskId) -> Option<&Column> {
        self.ordered_columns().find(|column| column.contains(task_id))
    }

    /// Checks if any column lists the task
    pub fn is_task_referenced(&self, task_id: &TaskId) -> bool {
        self.columns.values().any(|column| column.contains(task_id))
    }

    /// Reports every breach of the referential invariants
    pub fn integrity_violations(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();

        let mut seen_columns = HashSet::new();
        for id in &self.board.column_order {
            if !self.columns.contains_key(id) {
                violations.push(IntegrityViolation::DanglingColumn(id.clone()));
            } else if !seen_columns.insert(id) {
                violations.push(IntegrityViolation::DuplicateColumn(id.clone()));
            }
        }

        for (key, column) in &self.columns {
            if &column.id != key {
                violations.push(IntegrityViolation::MismatchedColumnKey(key.clone()));
            }
            if !seen_columns.contains(key) {
                violations.push(IntegrityViolation::OrphanColumn(key.clone()));
            }
        }

        for (key, task) in &self.tasks {
            if &task.id != key {
                violations.push(IntegrityViolation::MismatchedTaskKey(key.clone()));
            }
        }

        let mut seen_tasks = HashSet::new();
        for column in self.columns_for_scan() {
            for task_id in &column.task_ids {
                if !self.tasks.contains_key(task_id) {
                    violations.push(IntegrityViolation::DanglingTask {
                        column: column.id.clone(),
                        task: task_id.clone(),
                    });
                } else if !seen_tasks.insert(task_id) {
                    violations.push(IntegrityViolation::DuplicateTask {
                        column: column.id.clone(),
                        task: task_id.clone(),
                    });
                }
            }
        }

        violations
    }

    pub fn is_consistent(&self) -> bool {
        self.integrity_violations().is_empty()
    }

    /// Returns a copy that satisfies the referential invariants
    ///
    /// Dangling ids are dropped, orphan columns are appended to the column
    /// order, and a task listed several times stays only at its first listing
    /// in display order.
    pub fn repaired(&self) -> Snapshot {
        let columns: BTreeMap<ColumnId, Column> = self
            .columns
            .iter()
            .map(|(key, column)| {
                (
                    key.clone(),
                    Column {
                        id: key.clone(),
                        ..column.clone()
                    },
                )
            })
            .collect();

        let tasks: BTreeMap<TaskId, Task> = self
            .tasks
            .iter()
            .map(|(key, task)| {
                (
                    key.clone(),
                    Task {
                        id: key.clone(),
                        ..task.clone()
                    },
                )
            })
            .collect();

        let mut seen_columns = HashSet::new();
        let mut column_order: Vec<ColumnId> = self
            .board
            .column_order
            .iter()
            .filter(|id| columns.contains_key(*id) && seen_columns.insert((*id).clone()))
            .cloned()
            .collect();
        column_order.extend(
            columns
                .keys()
                .filter(|id| !seen_columns.contains(*id))
                .cloned()
                .collect::<Vec<_>>(),
        );

        let mut repaired = Snapshot {
            board: Board {
                column_order,
                ..self.board.clone()
            },
            columns,
            tasks,
        };

        let mut seen_tasks = HashSet::new();
        for column_id in repaired.board.column_order.clone() {
            if let Some(column) = repaired.columns.get_mut(&column_id) {
                let tasks = &repaired.tasks;
                column
                    .task_ids
                    .retain(|id| tasks.contains_key(id) && seen_tasks.insert(id.clone()));
            }
        }

        repaired
    }

    /// Columns in display order followed by any column the order misses
    fn columns_for_scan(&self) -> Vec<&Column> {
        let mut seen = HashSet::new();
        let mut columns: Vec<&Column> = self
            .board
            .column_order
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.columns.get(id))
            .collect();
        columns.extend(self.columns.values().filter(|c| !seen.contains(&c.id)));
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: &str) -> Task {
        Task::new(TaskId::new(id), format!("Task {}", id), Utc::now())
    }

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::initial(&StoreConfig::default());
        let mut todo = Column::new(ColumnId::new("col-1"), "To Do".to_string());
        todo.task_ids = vec![TaskId::new("task-1"), TaskId::new("task-2")];
        let mut doing = Column::new(ColumnId::new("col-2"), "In Progress".to_string());
        doing.task_ids = vec![TaskId::new("task-3")];

        snapshot.board.column_order = vec![todo.id.clone(), doing.id.clone()];
        snapshot.columns.insert(todo.id.clone(), todo);
        snapshot.columns.insert(doing.id.clone(), doing);
        for id in ["task-1", "task-2", "task-3"] {
            snapshot.tasks.insert(TaskId::new(id), task(id));
        }
        snapshot
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = Snapshot::initial(&StoreConfig::default());
        assert_eq!(snapshot.board.id.as_str(), "board-1");
        assert_eq!(snapshot.board.name, "Project Tasks");
        assert!(snapshot.columns.is_empty());
        assert!(snapshot.tasks.is_empty());
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_lookups() {
        let snapshot = sample();
        let titles: Vec<&str> = snapshot
            .tasks_in(&ColumnId::new("col-1"))
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Task task-1", "Task task-2"]);

        let column = snapshot.column_of(&TaskId::new("task-3")).unwrap();
        assert_eq!(column.id.as_str(), "col-2");
        assert!(snapshot.tasks_in(&ColumnId::new("missing")).is_empty());
    }

    #[test]
    fn test_consistent_sample() {
        assert!(sample().integrity_violations().is_empty());
    }

    #[test]
    fn test_detects_duplicate_task_reference() {
        let mut snapshot = sample();
        snapshot
            .columns
            .get_mut(&ColumnId::new("col-2"))
            .unwrap()
            .task_ids
            .push(TaskId::new("task-1"));

        assert_eq!(
            snapshot.integrity_violations(),
            vec![IntegrityViolation::DuplicateTask {
                column: ColumnId::new("col-2"),
                task: TaskId::new("task-1"),
            }]
        );
    }

    #[test]
    fn test_detects_dangling_and_orphan_columns() {
        let mut snapshot = sample();
        snapshot.board.column_order = vec![ColumnId::new("col-1"), ColumnId::new("col-9")];

        let violations = snapshot.integrity_violations();
        assert!(violations.contains(&IntegrityViolation::DanglingColumn(ColumnId::new("col-9"))));
        assert!(violations.contains(&IntegrityViolation::OrphanColumn(ColumnId::new("col-2"))));
    }

    #[test]
    fn test_repair_keeps_first_listing() {
        let mut snapshot = sample();
        let doing = snapshot.columns.get_mut(&ColumnId::new("col-2")).unwrap();
        doing.task_ids.push(TaskId::new("task-1"));
        doing.task_ids.push(TaskId::new("task-404"));
        snapshot.board.column_order.push(ColumnId::new("col-2"));

        let repaired = snapshot.repaired();
        assert!(repaired.is_consistent());
        assert_eq!(
            repaired.board.column_order,
            vec![ColumnId::new("col-1"), ColumnId::new("col-2")]
        );
        assert_eq!(
            repaired.columns[&ColumnId::new("col-2")].task_ids,
            vec![TaskId::new("task-3")]
        );
        assert_eq!(repaired.columns[&ColumnId::new("col-1")].task_ids.len(), 2);
    }

    #[test]
    fn test_repair_appends_orphan_columns() {
        let mut snapshot = sample();
        snapshot.board.column_order = vec![ColumnId::new("col-2")];

        let repaired = snapshot.repaired();
        assert_eq!(
            repaired.board.column_order,
            vec![ColumnId::new("col-2"), ColumnId::new("col-1")]
        );
    }

    #[test]
    fn test_repair_of_consistent_snapshot_is_identity() {
        let snapshot = sample();
        assert_eq!(snapshot.repaired(), snapshot);
    }
}
