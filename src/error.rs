use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TasklaneError>;

/// Which kind of entity a validation failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Board,
    Column,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board => write!(f, "Board"),
            Self::Column => write!(f, "Column"),
            Self::Task => write!(f, "Task"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TasklaneError {
    #[error("{entity} name cannot be empty")]
    EmptyName { entity: EntityKind },

    #[error("Could not generate a fresh {0} id")]
    IdExhausted(EntityKind),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "sqlite-storage")]
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

impl TasklaneError {
    /// True for errors caused by rejected input rather than I/O
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyName { .. })
    }
}
