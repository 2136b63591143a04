use crate::domain::task::Task;
use std::cmp::Ordering;
use std::str::FromStr;

/// Fields available for sorting the tasks of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Priority,
    Due,
    Created,
    Completed,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(SortField::Title),
            "priority" => Ok(SortField::Priority),
            "due" => Ok(SortField::Due),
            "created" => Ok(SortField::Created),
            "completed" => Ok(SortField::Completed),
            _ => Err(format!(
                "Invalid sort field '{}'. Valid fields: title, priority, due, created, completed",
                s
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Ascending),
            "desc" => Ok(SortOrder::Descending),
            _ => Err(format!(
                "Invalid sort order '{}'. Valid orders: asc, desc",
                s
            )),
        }
    }
}

/// Sorts tasks in-place by the given field and order
///
/// The sort is stable, so tasks that compare equal keep their current
/// relative position. Tasks without a due date or creation time always sort
/// after the ones that have one, whatever the direction.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use tasklane_core::domain::sorting::{sort_tasks, SortField, SortOrder};
/// use tasklane_core::domain::{Priority, Task, TaskId};
///
/// let now = Utc::now();
/// let mut low = Task::new(TaskId::new("t1"), "Low".to_string(), now);
/// low.priority = Priority::Low;
/// let mut high = Task::new(TaskId::new("t2"), "High".to_string(), now);
/// high.priority = Priority::High;
///
/// let mut tasks = vec![&low, &high];
/// sort_tasks(&mut tasks, SortField::Priority, SortOrder::Descending);
/// assert_eq!(tasks[0].id.as_str(), "t2");
/// ```
pub fn sort_tasks(tasks: &mut [&Task], field: SortField, order: SortOrder) {
    tasks.sort_by(|a, b| {
        let directed = |cmp: Ordering| match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        };

        match field {
            SortField::Title => directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
            SortField::Priority => directed(a.priority.cmp(&b.priority)),
            SortField::Completed => directed(a.is_completed.cmp(&b.is_completed)),
            SortField::Due => compare_present_first(a.due_date, b.due_date, directed),
            SortField::Created => compare_present_first(a.created_at, b.created_at, directed),
        }
    });
}

/// Compare optional values with `None` always sorting to the end
fn compare_present_first<T: Ord>(
    a: Option<T>,
    b: Option<T>,
    directed: impl Fn(Ordering) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
