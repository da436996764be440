//! In-process store, used by tests and throwaway sessions

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::KeyValueStore;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_replaces_previous_value() {
        let store = MemoryStore::new();
        assert_eq!(store.get("timers").await.unwrap(), None);

        store.set("timers", "[1]".into()).await.unwrap();
        store.set("timers", "[2]".into()).await.unwrap();
        assert_eq!(store.get("timers").await.unwrap().as_deref(), Some("[2]"));
    }
}
