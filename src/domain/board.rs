use crate::domain::ids::{BoardId, ColumnId, TaskId};
use serde::{Deserialize, Serialize};

/// A named, ordered bucket of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    #[serde(default)]
    pub task_ids: Vec<TaskId>,
}

impl Column {
    pub fn new(id: ColumnId, name: String) -> Self {
        Self {
            id,
            name,
            task_ids: Vec::new(),
        }
    }

    /// Checks if the column lists a task
    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.task_ids.iter().any(|id| id == task_id)
    }

    /// Returns the position of a task in this column
    pub fn position_of(&self, task_id: &TaskId) -> Option<usize> {
        self.task_ids.iter().position(|id| id == task_id)
    }
}

/// The singleton board ordering the columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub column_order: Vec<ColumnId>,
}

impl Board {
    pub fn new(id: BoardId, name: String) -> Self {
        Self {
            id,
            name,
            column_order: Vec::new(),
        }
    }

    /// Returns the display position of a column
    pub fn position_of(&self, column_id: &ColumnId) -> Option<usize> {
        self.column_order.iter().position(|id| id == column_id)
    }
}
