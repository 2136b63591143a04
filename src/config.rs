use serde::{Deserialize, Serialize};

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key of the storage slot holding the persisted record
    pub storage_key: String,
    /// Id given to the board when no persisted state exists
    pub board_id: String,
    /// Name given to the board when no persisted state exists
    pub board_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: "tasklane-board".to_string(),
            board_id: "board-1".to_string(),
            board_name: "Project Tasks".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: StoreConfig = serde_json::from_str(r#"{ "board_name": "Sprint" }"#).unwrap();
        assert_eq!(config.board_name, "Sprint");
        assert_eq!(config.storage_key, "tasklane-board");
        assert_eq!(config.board_id, "board-1");
    }
}
