//! Asynchronous string-keyed store abstraction

use async_trait::async_trait;

use crate::error::StoreError;

/// Opaque key-value persistence used by the repository
///
/// Values are whole serialized collections; `set` always replaces.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the value stored under `key`
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}
