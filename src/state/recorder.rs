//! Completion history recording

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use super::{HistoryEntry, Timer};
use crate::{error::StoreError, storage::TimerRepository};

/// Appends history entries, one read-modify-write at a time
pub struct HistoryRecorder {
    repository: TimerRepository,
    write_lock: Mutex<()>,
}

impl HistoryRecorder {
    pub fn new(repository: TimerRepository) -> Self {
        Self {
            repository,
            write_lock: Mutex::new(()),
        }
    }

    /// Append an entry for `timer`, stamped with the current time
    pub async fn record_completion(&self, timer: &Timer) -> Result<HistoryEntry, StoreError> {
        let _guard = self.write_lock.lock().await;

        let entry = HistoryEntry::completed(timer, Utc::now());
        let mut history = self.repository.load_history().await;
        history.push(entry.clone());
        self.repository.save_history(&history).await?;

        info!(
            "Recorded completion of '{}' ({} entries in history)",
            timer.name,
            history.len()
        );
        Ok(entry)
    }
}
