use crate::domain::{ids::TaskId, normalized_name};
use crate::error::{EntityKind, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Priority of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!(
                "Invalid priority '{}'. Valid priorities: none, low, medium, high",
                s
            )),
        }
    }
}

/// A task on the board
///
/// `is_completed` and `created_at` are owned by the store: new tasks are always
/// stamped by it and [`TaskUpdate`] cannot touch `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates an open task with no metadata, created at `now`
    pub fn new(id: TaskId, title: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            description: None,
            is_completed: false,
            priority: Priority::None,
            due_date: None,
            created_at: Some(now),
        }
    }
}

/// Reads a due date written either as `YYYY-MM-DD` or as a full RFC 3339
/// timestamp, keeping only the UTC calendar date of the latter
fn deserialize_due_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(&raw)
        .map(|timestamp| Some(timestamp.with_timezone(&Utc).date_naive()))
        .map_err(|_| de::Error::custom(format!("invalid due date '{}'", raw)))
}

/// Caller-supplied fields for a new task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Builds the stored task, trimming and validating the title
    pub(crate) fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Result<Task> {
        let title = normalized_name(&self.title, EntityKind::Task)?;
        Ok(Task {
            description: self.description,
            priority: self.priority,
            due_date: self.due_date,
            ..Task::new(id, title, now)
        })
    }
}

/// Partial update of a task; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub is_completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn completed(mut self, is_completed: bool) -> Self {
        self.is_completed = Some(is_completed);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// True when no field is provided
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns a copy of `task` with the provided fields overridden
    pub fn apply_to(&self, task: &Task) -> Result<Task> {
        let title = match &self.title {
            Some(title) => normalized_name(title, EntityKind::Task)?,
            None => task.title.clone(),
        };

        Ok(Task {
            id: task.id.clone(),
            title,
            description: self
                .description
                .clone()
                .unwrap_or_else(|| task.description.clone()),
            is_completed: self.is_completed.unwrap_or(task.is_completed),
            priority: self.priority.unwrap_or(task.priority),
            due_date: self.due_date.unwrap_or(task.due_date),
            created_at: task.created_at,
        })
    }
}
