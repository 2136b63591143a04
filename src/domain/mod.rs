pub mod board;
pub mod ids;
pub mod snapshot;
pub mod sorting;
pub mod task;

pub use board::{Board, Column};
pub use ids::{BoardId, ColumnId, TaskId};
pub use snapshot::{IntegrityViolation, Snapshot};
pub use sorting::{sort_tasks, SortField, SortOrder};
pub use task::{Priority, Task, TaskDraft, TaskUpdate};

use crate::error::{EntityKind, Result, TasklaneError};

/// Trims a user-entered name, rejecting names that are blank
pub(crate) fn normalized_name(raw: &str, entity: EntityKind) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TasklaneError::EmptyName { entity });
    }
    Ok(trimmed.to_string())
}
