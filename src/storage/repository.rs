//! Mapping between in-memory collections and the key-value store

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::{
    error::{Result, StoreError},
    state::{HistoryEntry, NewTimer, Timer},
};

/// Store key holding the timer collection
pub const TIMERS_KEY: &str = "timers";
/// Store key holding the completion history
pub const HISTORY_KEY: &str = "history";

/// Loads and saves the `timers` and `history` collections
///
/// Reads never fail: an absent or unreadable collection comes back empty.
/// Writes replace the whole collection.
#[derive(Clone)]
pub struct TimerRepository {
    store: Arc<dyn KeyValueStore>,
}

impl TimerRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load_timers(&self) -> Vec<Timer> {
        self.load_collection(TIMERS_KEY).await
    }

    pub async fn save_timers(&self, timers: &[Timer]) -> std::result::Result<(), StoreError> {
        self.save_collection(TIMERS_KEY, timers).await
    }

    pub async fn load_history(&self) -> Vec<HistoryEntry> {
        self.load_collection(HISTORY_KEY).await
    }

    pub async fn save_history(
        &self,
        history: &[HistoryEntry],
    ) -> std::result::Result<(), StoreError> {
        self.save_collection(HISTORY_KEY, history).await
    }

    /// Validate a draft, append it to `current` and persist the result
    ///
    /// Returns the new timer and the collection that was written. Nothing is
    /// written when validation fails.
    pub async fn create_timer(
        &self,
        current: &[Timer],
        draft: NewTimer,
    ) -> Result<(Timer, Vec<Timer>)> {
        let timer = Timer::create(draft)?;
        let mut timers = current.to_vec();
        timers.push(timer.clone());
        self.save_timers(&timers).await?;
        debug!("Appended timer {} to the stored collection", timer.id);
        Ok((timer, timers))
    }

    async fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored '{}' collection, starting empty", key);
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read '{}' collection, starting empty: {}", key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!("Stored '{}' collection is malformed, starting empty: {}", key, e);
                Vec::new()
            }
        }
    }

    async fn save_collection<T: Serialize>(
        &self,
        key: &str,
        items: &[T],
    ) -> std::result::Result<(), StoreError> {
        let raw = serde_json::to_string(items)?;
        self.store.set(key, raw).await?;
        debug!("Saved {} record(s) under '{}'", items.len(), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{TimerError, ValidationError},
        state::{Category, TimerStatus},
        storage::MemoryStore,
    };

    fn repository() -> (Arc<MemoryStore>, TimerRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = TimerRepository::new(store.clone());
        (store, repo)
    }

    #[tokio::test]
    async fn absent_and_malformed_collections_load_empty() {
        let (store, repo) = repository();
        assert!(repo.load_timers().await.is_empty());

        store.set(TIMERS_KEY, "not json".into()).await.unwrap();
        store.set(HISTORY_KEY, r#"{"oops":true}"#.into()).await.unwrap();
        assert!(repo.load_timers().await.is_empty());
        assert!(repo.load_history().await.is_empty());
    }

    #[tokio::test]
    async fn create_timer_appends_and_persists() {
        let (store, repo) = repository();
        let (first, timers) = repo
            .create_timer(&[], NewTimer::new("Run", 30, Category::Workout))
            .await
            .unwrap();
        let (second, timers) = repo
            .create_timer(&timers, NewTimer::new("Read", 60, Category::Study))
            .await
            .unwrap();

        assert_eq!(timers, vec![first, second.clone()]);
        assert_eq!(repo.load_timers().await, timers);
        assert_eq!(second.status, TimerStatus::Paused);

        let raw = store.get(TIMERS_KEY).await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[1]["remainingTime"], 60);
        assert_eq!(json[1]["category"], "Study");
    }

    #[tokio::test]
    async fn invalid_draft_writes_nothing() {
        let (store, repo) = repository();
        let err = repo
            .create_timer(&[], NewTimer::new("", 30, Category::Break))
            .await
            .unwrap_err();
        assert!(matches!(err, TimerError::Validation(ValidationError::EmptyName)));
        assert_eq!(store.get(TIMERS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_timers_replaces_the_collection() {
        let (_, repo) = repository();
        let a = Timer::create(NewTimer::new("A", 5, Category::Break)).unwrap();
        let b = Timer::create(NewTimer::new("B", 5, Category::Break)).unwrap();
        repo.save_timers(&[a, b.clone()]).await.unwrap();
        repo.save_timers(&[b.clone()]).await.unwrap();
        assert_eq!(repo.load_timers().await, vec![b]);
    }
}
