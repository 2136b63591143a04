use crate::error::EntityKind;
use uuid::Uuid;

/// Source of fresh entity ids
///
/// The store asks for a new id on every creation and skips any value already
/// present in its snapshot, so a generator only has to avoid repeating itself.
pub trait IdGenerator: Send {
    fn next_id(&mut self, kind: EntityKind) -> String;

    /// Called once for every id of the snapshot a store is opened on
    fn observe(&mut self, _kind: EntityKind, _id: &str) {}
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self, _kind: EntityKind) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic ids of the form `c1, c2, ...` for columns and `t1, t2, ...` for tasks
///
/// A store opened on a saved board moves the counters past the highest suffix
/// it holds. Deleted ids above that suffix are not remembered across a reopen
/// and can be issued again, so boards that outlive a session should use
/// [`UuidGenerator`].
#[derive(Debug, Clone)]
pub struct SequentialGenerator {
    next_board: u64,
    next_column: u64,
    next_task: u64,
}

impl SequentialGenerator {
    pub fn new() -> Self {
        Self {
            next_board: 1,
            next_column: 1,
            next_task: 1,
        }
    }

    fn counter(&mut self, kind: EntityKind) -> (&'static str, &mut u64) {
        match kind {
            EntityKind::Board => ("b", &mut self.next_board),
            EntityKind::Column => ("c", &mut self.next_column),
            EntityKind::Task => ("t", &mut self.next_task),
        }
    }
}

impl Default for SequentialGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialGenerator {
    fn next_id(&mut self, kind: EntityKind) -> String {
        let (prefix, counter) = self.counter(kind);
        let id = format!("{}{}", prefix, counter);
        *counter += 1;
        id
    }

    fn observe(&mut self, kind: EntityKind, id: &str) {
        let (prefix, counter) = self.counter(kind);
        let seen = id
            .strip_prefix(prefix)
            .and_then(|suffix| suffix.parse::<u64>().ok());
        if let Some(seen) = seen {
            *counter = (*counter).max(seen.saturating_add(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_counters_are_per_kind() {
        let mut ids = SequentialGenerator::new();
        assert_eq!(ids.next_id(EntityKind::Column), "c1");
        assert_eq!(ids.next_id(EntityKind::Task), "t1");
        assert_eq!(ids.next_id(EntityKind::Column), "c2");
        assert_eq!(ids.next_id(EntityKind::Task), "t2");
    }

    #[test]
    fn test_observed_ids_advance_counters() {
        let mut ids = SequentialGenerator::new();
        ids.observe(EntityKind::Task, "t7");
        ids.observe(EntityKind::Task, "t3");
        ids.observe(EntityKind::Column, "board-1");
        ids.observe(EntityKind::Column, "c");

        assert_eq!(ids.next_id(EntityKind::Task), "t8");
        assert_eq!(ids.next_id(EntityKind::Column), "c1");
    }

    #[test]
    fn test_uuid_ids_are_unique() {
        let mut ids = UuidGenerator;
        let a = ids.next_id(EntityKind::Task);
        let b = ids.next_id(EntityKind::Task);
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
