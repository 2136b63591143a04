use crate::error::Result;
use async_trait::async_trait;

#[cfg(feature = "file-storage")]
pub mod file_storage;
pub mod memory_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

/// Durable key-value slots holding serialized board records
#[async_trait]
pub trait SlotStorage: Send + Sync {
    /// Reads a slot, returning `None` if it was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a slot, overwriting any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
