//! Store operations as pure snapshot transitions
//!
//! [`apply`] never mutates the snapshot it is given. It either reports that the
//! operation is a no-op or returns a complete next snapshot, so a half-applied
//! change can never be observed.

use crate::domain::{
    normalized_name, sort_tasks, Column, ColumnId, Snapshot, SortField, SortOrder, TaskDraft,
    TaskId, TaskUpdate,
};
use crate::error::{EntityKind, Result, TasklaneError};
use crate::store::id_generator::IdGenerator;
use chrono::{DateTime, Utc};

const MAX_ID_ATTEMPTS: usize = 1024;

/// A mutation request against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    AddTask {
        column_id: ColumnId,
        draft: TaskDraft,
    },
    UpdateTask {
        task_id: TaskId,
        update: TaskUpdate,
    },
    DeleteTask {
        task_id: TaskId,
    },
    AddColumn {
        name: String,
    },
    UpdateColumnName {
        column_id: ColumnId,
        name: String,
    },
    DeleteColumn {
        column_id: ColumnId,
    },
    UpdateBoardName {
        name: String,
    },
    ReorderColumns {
        order: Vec<ColumnId>,
    },
    ReorderTasks {
        column_id: ColumnId,
        order: Vec<TaskId>,
    },
    MoveColumn {
        column_id: ColumnId,
        to_index: usize,
    },
    MoveTask {
        task_id: TaskId,
        to_index: usize,
    },
    SortColumn {
        column_id: ColumnId,
        field: SortField,
        order: SortOrder,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddTask { .. } => "add_task",
            Self::UpdateTask { .. } => "update_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::AddColumn { .. } => "add_column",
            Self::UpdateColumnName { .. } => "update_column_name",
            Self::DeleteColumn { .. } => "delete_column",
            Self::UpdateBoardName { .. } => "update_board_name",
            Self::ReorderColumns { .. } => "reorder_columns",
            Self::ReorderTasks { .. } => "reorder_tasks",
            Self::MoveColumn { .. } => "move_column",
            Self::MoveTask { .. } => "move_task",
            Self::SortColumn { .. } => "sort_column",
        }
    }
}

/// What a committed operation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stale reference or nothing to change; the snapshot was kept
    Unchanged,
    Updated,
    TaskCreated(TaskId),
    ColumnCreated(ColumnId),
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Result of applying an operation to a snapshot
#[derive(Debug)]
pub enum Transition {
    Unchanged,
    Changed(Snapshot, Outcome),
}

/// Computes the snapshot following `operation`
pub fn apply(
    snapshot: &Snapshot,
    operation: Operation,
    ids: &mut dyn IdGenerator,
    now: DateTime<Utc>,
) -> Result<Transition> {
    match operation {
        Operation::AddTask { column_id, draft } => add_task(snapshot, column_id, draft, ids, now),
        Operation::UpdateTask { task_id, update } => update_task(snapshot, &task_id, &update),
        Operation::DeleteTask { task_id } => Ok(delete_task(snapshot, &task_id)),
        Operation::AddColumn { name } => add_column(snapshot, &name, ids),
        Operation::UpdateColumnName { column_id, name } => {
            update_column_name(snapshot, &column_id, &name)
        }
        Operation::DeleteColumn { column_id } => Ok(delete_column(snapshot, &column_id)),
        Operation::UpdateBoardName { name } => update_board_name(snapshot, &name),
        Operation::ReorderColumns { order } => Ok(reorder_columns(snapshot, order)),
        Operation::ReorderTasks { column_id, order } => {
            Ok(reorder_tasks(snapshot, &column_id, order))
        }
        Operation::MoveColumn {
            column_id,
            to_index,
        } => Ok(move_column(snapshot, &column_id, to_index)),
        Operation::MoveTask { task_id, to_index } => Ok(move_task(snapshot, &task_id, to_index)),
        Operation::SortColumn {
            column_id,
            field,
            order,
        } => Ok(sort_column(snapshot, &column_id, field, order)),
    }
}

fn add_task(
    snapshot: &Snapshot,
    column_id: ColumnId,
    draft: TaskDraft,
    ids: &mut dyn IdGenerator,
    now: DateTime<Utc>,
) -> Result<Transition> {
    normalized_name(&draft.title, EntityKind::Task)?;
    if !snapshot.columns.contains_key(&column_id) {
        return Ok(Transition::Unchanged);
    }

    let task_id = TaskId::new(fresh_id(ids, EntityKind::Task, |id| {
        snapshot.tasks.contains_key(&TaskId::new(id))
    })?);
    let task = draft.into_task(task_id.clone(), now)?;

    let mut next = snapshot.clone();
    next.tasks.insert(task_id.clone(), task);
    if let Some(column) = next.columns.get_mut(&column_id) {
        column.task_ids.push(task_id.clone());
    }

    Ok(Transition::Changed(next, Outcome::TaskCreated(task_id)))
}

fn update_task(snapshot: &Snapshot, task_id: &TaskId, update: &TaskUpdate) -> Result<Transition> {
    if update.is_empty() {
        return Ok(Transition::Unchanged);
    }
    if let Some(title) = &update.title {
        normalized_name(title, EntityKind::Task)?;
    }
    let Some(task) = snapshot.tasks.get(task_id) else {
        return Ok(Transition::Unchanged);
    };

    let updated = update.apply_to(task)?;
    if &updated == task {
        return Ok(Transition::Unchanged);
    }

    let mut next = snapshot.clone();
    next.tasks.insert(task_id.clone(), updated);
    Ok(Transition::Changed(next, Outcome::Updated))
}

fn delete_task(snapshot: &Snapshot, task_id: &TaskId) -> Transition {
    if !snapshot.is_task_referenced(task_id) {
        return Transition::Unchanged;
    }

    let mut next = snapshot.clone();
    for column in next.columns.values_mut() {
        column.task_ids.retain(|id| id != task_id);
    }
    next.tasks.remove(task_id);

    Transition::Changed(next, Outcome::Updated)
}

fn add_column(snapshot: &Snapshot, name: &str, ids: &mut dyn IdGenerator) -> Result<Transition> {
    let name = normalized_name(name, EntityKind::Column)?;
    let column_id = ColumnId::new(fresh_id(ids, EntityKind::Column, |id| {
        snapshot.columns.contains_key(&ColumnId::new(id))
    })?);

    let mut next = snapshot.clone();
    next.columns
        .insert(column_id.clone(), Column::new(column_id.clone(), name));
    next.board.column_order.push(column_id.clone());

    Ok(Transition::Changed(next, Outcome::ColumnCreated(column_id)))
}

fn update_column_name(snapshot: &Snapshot, column_id: &ColumnId, name: &str) -> Result<Transition> {
    let name = normalized_name(name, EntityKind::Column)?;
    let Some(column) = snapshot.columns.get(column_id) else {
        return Ok(Transition::Unchanged);
    };
    if column.name == name {
        return Ok(Transition::Unchanged);
    }

    let mut next = snapshot.clone();
    next.columns.insert(
        column_id.clone(),
        Column {
            name,
            ..column.clone()
        },
    );
    Ok(Transition::Changed(next, Outcome::Updated))
}

fn delete_column(snapshot: &Snapshot, column_id: &ColumnId) -> Transition {
    let Some(column) = snapshot.columns.get(column_id) else {
        return Transition::Unchanged;
    };

    let mut next = snapshot.clone();
    next.board.column_order.retain(|id| id != column_id);
    next.columns.remove(column_id);
    for task_id in &column.task_ids {
        next.tasks.remove(task_id);
    }
    // A task wrongly listed by another column too must not be left dangling there
    for other in next.columns.values_mut() {
        other.task_ids.retain(|id| !column.contains(id));
    }

    Transition::Changed(next, Outcome::Updated)
}

fn update_board_name(snapshot: &Snapshot, name: &str) -> Result<Transition> {
    let name = normalized_name(name, EntityKind::Board)?;
    if snapshot.board.name == name {
        return Ok(Transition::Unchanged);
    }

    let mut next = snapshot.clone();
    next.board.name = name;
    Ok(Transition::Changed(next, Outcome::Updated))
}

fn reorder_columns(snapshot: &Snapshot, order: Vec<ColumnId>) -> Transition {
    if order == snapshot.board.column_order || !is_permutation(&snapshot.board.column_order, &order) {
        return Transition::Unchanged;
    }

    let mut next = snapshot.clone();
    next.board.column_order = order;
    Transition::Changed(next, Outcome::Updated)
}

fn reorder_tasks(snapshot: &Snapshot, column_id: &ColumnId, order: Vec<TaskId>) -> Transition {
    let Some(column) = snapshot.columns.get(column_id) else {
        return Transition::Unchanged;
    };
    if order == column.task_ids || !is_permutation(&column.task_ids, &order) {
        return Transition::Unchanged;
    }

    replace_task_order(snapshot, column_id, order)
}

fn move_column(snapshot: &Snapshot, column_id: &ColumnId, to_index: usize) -> Transition {
    let Some(order) = moved(&snapshot.board.column_order, column_id, to_index) else {
        return Transition::Unchanged;
    };

    let mut next = snapshot.clone();
    next.board.column_order = order;
    Transition::Changed(next, Outcome::Updated)
}

fn move_task(snapshot: &Snapshot, task_id: &TaskId, to_index: usize) -> Transition {
    let Some(column) = snapshot.column_of(task_id) else {
        return Transition::Unchanged;
    };
    let Some(order) = moved(&column.task_ids, task_id, to_index) else {
        return Transition::Unchanged;
    };

    replace_task_order(snapshot, &column.id, order)
}

fn sort_column(
    snapshot: &Snapshot,
    column_id: &ColumnId,
    field: SortField,
    order: SortOrder,
) -> Transition {
    let Some(column) = snapshot.columns.get(column_id) else {
        return Transition::Unchanged;
    };

    let mut tasks = snapshot.tasks_in(column_id);
    sort_tasks(&mut tasks, field, order);
    let sorted: Vec<TaskId> = tasks.iter().map(|task| task.id.clone()).collect();
    if sorted == column.task_ids {
        return Transition::Unchanged;
    }

    replace_task_order(snapshot, column_id, sorted)
}

fn replace_task_order(snapshot: &Snapshot, column_id: &ColumnId, order: Vec<TaskId>) -> Transition {
    let mut next = snapshot.clone();
    if let Some(column) = next.columns.get_mut(column_id) {
        column.task_ids = order;
    }
    Transition::Changed(next, Outcome::Updated)
}

/// Asks the generator for ids until one is not `taken`
fn fresh_id(
    ids: &mut dyn IdGenerator,
    kind: EntityKind,
    taken: impl Fn(&str) -> bool,
) -> Result<String> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = ids.next_id(kind);
        if !id.is_empty() && !taken(&id) {
            return Ok(id);
        }
    }
    Err(TasklaneError::IdExhausted(kind))
}

fn is_permutation<T: Ord + Clone>(current: &[T], proposed: &[T]) -> bool {
    if current.len() != proposed.len() {
        return false;
    }
    let mut a = current.to_vec();
    let mut b = proposed.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Returns `items` with `item` moved to `to_index` (clamped), or `None` if absent or already there
fn moved<T: PartialEq + Clone>(items: &[T], item: &T, to_index: usize) -> Option<Vec<T>> {
    let from = items.iter().position(|i| i == item)?;
    let to = to_index.min(items.len() - 1);
    if from == to {
        return None;
    }

    let mut order = items.to_vec();
    let value = order.remove(from);
    order.insert(to, value);
    Some(order)
}
