//! Versioned persistence of board snapshots
//!
//! A snapshot is stored as `{ "version": N, "state": <snapshot> }` in a single
//! storage slot. Loading never fails: a missing, unreadable or corrupt slot
//! yields the initial board, and the bad record is replaced on the next save.

use crate::{
    config::StoreConfig,
    domain::Snapshot,
    error::Result,
    storage::SlotStorage,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Schema version written by [`PersistenceAdapter::save`]
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct RecordRef<'a> {
    version: u32,
    state: &'a Snapshot,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    version: u32,
    state: Value,
}

/// Saves and restores snapshots through a [`SlotStorage`] backend
pub struct PersistenceAdapter<S> {
    storage: S,
    config: StoreConfig,
}

impl<S: SlotStorage> PersistenceAdapter<S> {
    pub fn new(storage: S, config: StoreConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Serializes `snapshot` and overwrites the slot
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let payload = encode(snapshot)?;
        self.storage.set(&self.config.storage_key, &payload).await?;
        debug!(
            key = %self.config.storage_key,
            columns = snapshot.columns.len(),
            tasks = snapshot.tasks.len(),
            "saved board"
        );
        Ok(())
    }

    /// Restores the persisted snapshot, falling back to the initial board
    pub async fn load(&self) -> Snapshot {
        let key = &self.config.storage_key;
        match self.storage.get(key).await {
            Ok(Some(payload)) => match decode(&payload) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding corrupt board record");
                    Snapshot::initial(&self.config)
                }
            },
            Ok(None) => {
                info!(key = %key, "no saved board, starting empty");
                Snapshot::initial(&self.config)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "failed to read board record, starting empty");
                Snapshot::initial(&self.config)
            }
        }
    }
}

/// Serializes a snapshot into the versioned record format
pub fn encode(snapshot: &Snapshot) -> Result<String> {
    let record = RecordRef {
        version: SCHEMA_VERSION,
        state: snapshot,
    };
    Ok(serde_json::to_string_pretty(&record)?)
}

/// Parses a versioned record, migrating and repairing it as needed
pub fn decode(payload: &str) -> Result<Snapshot> {
    let record: RawRecord = serde_json::from_str(payload)?;
    let state = migrate(record.version, record.state);
    let snapshot: Snapshot = serde_json::from_value(state)?;

    let violations = snapshot.integrity_violations();
    if violations.is_empty() {
        return Ok(snapshot);
    }

    for violation in &violations {
        warn!(%violation, "repairing saved board");
    }
    Ok(snapshot.repaired())
}

/// Brings a stored state up to [`SCHEMA_VERSION`]
fn migrate(version: u32, state: Value) -> Value {
    match version {
        SCHEMA_VERSION => state,
        v if v > SCHEMA_VERSION => {
            warn!(version = v, current = SCHEMA_VERSION, "board saved by a newer version, reading as-is");
            state
        }
        v => {
            // Version 1 is the first schema; earlier records already share its layout
            debug!(version = v, current = SCHEMA_VERSION, "migrating board record");
            state
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnId, Priority, TaskDraft, TaskId, TaskUpdate};
    use crate::error::TasklaneError;
    use crate::storage::memory_storage::MemoryStorage;
    use crate::store::{EntityStore, SequentialGenerator};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    /// Storage whose every call fails
    struct BrokenStorage;

    #[async_trait]
    impl SlotStorage for BrokenStorage {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(TasklaneError::StorageError("disk unavailable".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(TasklaneError::StorageError("disk unavailable".to_string()))
        }
    }

    fn populated() -> Snapshot {
        let mut store = EntityStore::new(
            Snapshot::initial(&StoreConfig::default()),
            SequentialGenerator::new(),
        );
        let todo = store.add_column("To Do").unwrap();
        let done = store.add_column("Done").unwrap();
        let t1 = store
            .add_task(
                &todo,
                TaskDraft::new("Design homepage")
                    .with_description("Create wireframes")
                    .with_priority(Priority::High)
                    .with_due_date(NaiveDate::from_ymd_opt(2023, 12, 15).unwrap()),
            )
            .unwrap()
            .unwrap();
        store.add_task(&done, TaskDraft::new("Setup database")).unwrap();
        store
            .update_task(&t1, TaskUpdate::new().completed(true))
            .unwrap();
        (*store.state()).clone()
    }

    fn adapter() -> PersistenceAdapter<MemoryStorage> {
        PersistenceAdapter::new(MemoryStorage::new(), StoreConfig::default())
    }

    #[tokio::test]
    async fn test_load_without_record_gives_initial_board() {
        let snapshot = adapter().load().await;
        assert_eq!(snapshot, Snapshot::initial(&StoreConfig::default()));
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let adapter = adapter();
        let snapshot = populated();

        adapter.save(&snapshot).await.unwrap();
        assert_eq!(adapter.load().await, snapshot);
    }

    #[tokio::test]
    async fn test_record_layout() {
        let adapter = adapter();
        adapter.save(&populated()).await.unwrap();

        let raw = adapter.storage().get("tasklane-board").await.unwrap().unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(json["state"]["board"]["columnOrder"], serde_json::json!(["c1", "c2"]));
        assert_eq!(json["state"]["columns"]["c1"]["taskIds"], serde_json::json!(["t1"]));
        let task = &json["state"]["tasks"]["t1"];
        assert_eq!(task["priority"], "High");
        assert_eq!(task["isCompleted"], true);
        assert_eq!(task["dueDate"], "2023-12-15");
        assert!(task["createdAt"].is_string());
        assert!(json["state"]["tasks"]["t2"]["description"].is_null());
    }

    #[tokio::test]
    async fn test_corrupt_record_falls_back_to_initial_board() {
        let storage = MemoryStorage::with_slot("tasklane-board", "{ not json");
        let adapter = PersistenceAdapter::new(storage, StoreConfig::default());

        assert_eq!(adapter.load().await, Snapshot::initial(&StoreConfig::default()));
    }

    #[tokio::test]
    async fn test_wrong_shape_falls_back_to_initial_board() {
        let storage = MemoryStorage::with_slot(
            "tasklane-board",
            r#"{ "version": 1, "state": { "board": 42 } }"#,
        );
        let adapter = PersistenceAdapter::new(storage, StoreConfig::default());

        assert!(adapter.load().await.columns.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_storage_falls_back_to_initial_board() {
        let adapter = PersistenceAdapter::new(BrokenStorage, StoreConfig::default());
        assert_eq!(adapter.load().await, Snapshot::initial(&StoreConfig::default()));
        assert!(adapter.save(&populated()).await.is_err());
    }

    #[tokio::test]
    async fn test_initial_board_uses_config() {
        let config = StoreConfig {
            board_name: "Sprint Board".to_string(),
            ..StoreConfig::default()
        };
        let adapter = PersistenceAdapter::new(MemoryStorage::new(), config);
        assert_eq!(adapter.load().await.board.name, "Sprint Board");
    }

    #[test]
    fn test_decode_full_record() {
        let payload = r#"{
            "version": 1,
            "state": {
                "board": { "id": "board-1", "name": "Project Tasks", "columnOrder": ["col-1"] },
                "columns": { "col-1": { "id": "col-1", "name": "To Do", "taskIds": ["task-1"] } },
                "tasks": { "task-1": {
                    "id": "task-1", "title": "Design homepage", "description": null,
                    "isCompleted": false, "priority": "High",
                    "dueDate": "2023-12-15", "createdAt": "2023-11-20T09:15:00Z"
                } }
            }
        }"#;

        let snapshot = decode(payload).unwrap();
        let task = snapshot.task(&TaskId::new("task-1")).unwrap();
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2023, 12, 15));
        assert_eq!(
            task.created_at.unwrap().to_rfc3339(),
            "2023-11-20T09:15:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_load_keeps_board_with_timestamp_due_dates() {
        let payload = r#"{
            "version": 1,
            "state": {
                "board": { "id": "board-1", "name": "Project Tasks", "columnOrder": ["col-1"] },
                "columns": { "col-1": { "id": "col-1", "name": "To Do", "taskIds": ["task-1", "task-2"] } },
                "tasks": {
                    "task-1": { "id": "task-1", "title": "Design homepage", "dueDate": "2023-12-15T00:00:00.000Z" },
                    "task-2": { "id": "task-2", "title": "Setup database", "dueDate": "2024-01-10" }
                }
            }
        }"#;
        let adapter = PersistenceAdapter::new(
            MemoryStorage::with_slot("tasklane-board", payload),
            StoreConfig::default(),
        );

        let snapshot = adapter.load().await;
        assert_eq!(snapshot.tasks.len(), 2);
        assert_eq!(
            snapshot.task(&TaskId::new("task-1")).unwrap().due_date,
            NaiveDate::from_ymd_opt(2023, 12, 15)
        );
        assert_eq!(
            snapshot.task(&TaskId::new("task-2")).unwrap().due_date,
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );

        adapter.save(&snapshot).await.unwrap();
        let raw = adapter.storage().get("tasklane-board").await.unwrap().unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["state"]["tasks"]["task-1"]["dueDate"], "2023-12-15");
    }

    #[test]
    fn test_decode_other_versions_passes_through() {
        let snapshot = populated();
        let payload = encode(&snapshot).unwrap();
        for version in [0, 2] {
            let bumped = payload.replacen("\"version\": 1", &format!("\"version\": {}", version), 1);
            assert_ne!(bumped, payload);
            assert_eq!(decode(&bumped).unwrap(), snapshot);
        }
    }

    #[test]
    fn test_decode_repairs_dangling_references() {
        let payload = r#"{
            "version": 1,
            "state": {
                "board": { "id": "board-1", "name": "Project Tasks", "columnOrder": ["col-1", "col-9"] },
                "columns": {
                    "col-1": { "id": "col-1", "name": "To Do", "taskIds": ["task-1", "task-9"] },
                    "col-2": { "id": "col-2", "name": "Done", "taskIds": ["task-1"] }
                },
                "tasks": { "task-1": { "id": "task-1", "title": "Shared" } }
            }
        }"#;

        let snapshot = decode(payload).unwrap();
        assert!(snapshot.is_consistent());
        assert_eq!(
            snapshot.board.column_order,
            vec![ColumnId::new("col-1"), ColumnId::new("col-2")]
        );
        assert_eq!(
            snapshot.columns[&ColumnId::new("col-1")].task_ids,
            vec![TaskId::new("task-1")]
        );
        assert!(snapshot.columns[&ColumnId::new("col-2")].task_ids.is_empty());
    }

    mod roundtrip {
        use super::*;
        use chrono::{TimeZone, Utc};
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        struct TaskSpec {
            column: usize,
            title: String,
            description: Option<String>,
            priority: Priority,
            due_in_days: Option<i32>,
            completed: bool,
            created_nanos: u32,
        }

        fn priority() -> impl Strategy<Value = Priority> {
            prop_oneof![
                Just(Priority::None),
                Just(Priority::Low),
                Just(Priority::Medium),
                Just(Priority::High),
            ]
        }

        fn task_spec() -> impl Strategy<Value = TaskSpec> {
            (
                0usize..4,
                "[A-Za-z][A-Za-z ]{0,12}",
                prop::option::of("[ -~\n]{0,24}"),
                priority(),
                prop::option::of(0i32..3650),
                any::<bool>(),
                0u32..1_000_000_000,
            )
                .prop_map(
                    |(column, title, description, priority, due_in_days, completed, created_nanos)| {
                        TaskSpec {
                            column,
                            title,
                            description,
                            priority,
                            due_in_days,
                            completed,
                            created_nanos,
                        }
                    },
                )
        }

        /// Builds a board through the store, then gives each task its own creation instant
        fn board(columns: &[String], tasks: &[TaskSpec]) -> Snapshot {
            let mut store = EntityStore::new(
                Snapshot::initial(&StoreConfig::default()),
                SequentialGenerator::new(),
            );
            let column_ids: Vec<ColumnId> = columns
                .iter()
                .map(|name| store.add_column(name).unwrap())
                .collect();

            let epoch = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
            let mut created = Vec::new();
            for spec in tasks {
                let column = &column_ids[spec.column % column_ids.len()];
                let mut draft = TaskDraft::new(spec.title.clone()).with_priority(spec.priority);
                if let Some(description) = &spec.description {
                    draft = draft.with_description(description.clone());
                }
                if let Some(days) = spec.due_in_days {
                    draft = draft.with_due_date(epoch + chrono::Duration::days(days.into()));
                }
                let id = store.add_task(column, draft).unwrap().unwrap();
                store
                    .update_task(&id, TaskUpdate::new().completed(spec.completed))
                    .unwrap();
                created.push((id, spec.created_nanos));
            }

            let mut snapshot = (*store.state()).clone();
            for (i, (id, nanos)) in created.into_iter().enumerate() {
                let at = Utc
                    .timestamp_opt(1_700_000_000 + i as i64 * 97, nanos)
                    .single()
                    .unwrap();
                snapshot.tasks.get_mut(&id).unwrap().created_at = Some(at);
            }
            snapshot
        }

        proptest! {
            #[test]
            fn decode_restores_encoded_snapshot(
                columns in prop::collection::vec("[A-Za-z][A-Za-z0-9 ]{0,10}", 1..4),
                tasks in prop::collection::vec(task_spec(), 0..12),
                board_name in "[A-Za-z][A-Za-z ]{0,16}",
            ) {
                let mut snapshot = board(&columns, &tasks);
                snapshot.board.name = board_name.trim().to_string();
                prop_assert!(snapshot.is_consistent());

                let decoded = decode(&encode(&snapshot).unwrap()).unwrap();
                prop_assert_eq!(decoded, snapshot);
            }
        }
    }
}
