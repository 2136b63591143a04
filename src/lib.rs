//! # Tasklane Core
//!
//! Normalized store for a single kanban board: one board ordering columns,
//! columns ordering tasks, and a versioned persistence layer.
//!
//! This crate exposes data and operations only. Rendering and input handling
//! belong to the application that embeds it.
//!
//! ```
//! use tasklane_core::{EntityStore, SequentialGenerator, Snapshot, StoreConfig, TaskDraft};
//!
//! let mut store = EntityStore::new(
//!     Snapshot::initial(&StoreConfig::default()),
//!     SequentialGenerator::new(),
//! );
//! let todo = store.add_column("To Do").unwrap();
//! let task = store.add_task(&todo, TaskDraft::new("Write spec")).unwrap().unwrap();
//!
//! assert_eq!(store.state().columns[&todo].task_ids, vec![task]);
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod session;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use config::StoreConfig;
pub use domain::{
    board::{Board, Column},
    ids::{BoardId, ColumnId, TaskId},
    snapshot::{IntegrityViolation, Snapshot},
    sorting::{SortField, SortOrder},
    task::{Priority, Task, TaskDraft, TaskUpdate},
};
pub use error::{EntityKind, Result, TasklaneError};
pub use persistence::{PersistenceAdapter, SCHEMA_VERSION};
pub use session::BoardSession;
pub use storage::{memory_storage::MemoryStorage, SlotStorage};
pub use store::{
    EntityStore, IdGenerator, Operation, Outcome, SequentialGenerator, SubscriptionId,
    UuidGenerator,
};

#[cfg(feature = "file-storage")]
pub use storage::file_storage::FileStorage;
#[cfg(feature = "sqlite-storage")]
pub use storage::sqlite_storage::SqliteStorage;
