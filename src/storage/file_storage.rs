use crate::{
    error::{Result, TasklaneError},
    storage::SlotStorage,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-based storage: one JSON file per slot
pub struct FileStorage {
    root_path: PathBuf,
}

impl FileStorage {
    const TASKLANE_DIR: &'static str = ".tasklane";

    /// Creates a FileStorage keeping its slots under `<project_root>/.tasklane`
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: project_root.as_ref().join(Self::TASKLANE_DIR),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn slot_file(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(TasklaneError::StorageError(format!(
                "Invalid slot key: {:?}",
                key
            )));
        }
        Ok(self.root_path.join(format!("{}.json", key)))
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SlotStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let file_path = self.slot_file(key)?;

        if !file_path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&file_path).await?;
        Ok(Some(contents))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let file_path = self.slot_file(key)?;
        self.ensure_directory_exists(&self.root_path).await?;

        // Atomic replace through a temp file
        let tmp_path = file_path.with_extension("json.tmp");
        fs::write(&tmp_path, value).await?;
        fs::rename(&tmp_path, &file_path).await?;
        Ok(())
    }
}
