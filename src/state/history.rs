//! Completion history records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timer::{Category, Timer};

/// Immutable record of one timer completion
///
/// Serialized as the timer's own fields plus `completionTime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub timer: Timer,
    pub completion_time: DateTime<Utc>,
}

impl HistoryEntry {
    /// Capture a timer as it was at the moment it completed
    pub fn completed(timer: &Timer, completion_time: DateTime<Utc>) -> Self {
        Self {
            timer: timer.clone(),
            completion_time,
        }
    }

    pub fn category(&self) -> Category {
        self.timer.category
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::state::timer::{NewTimer, TimerStatus};

    #[test]
    fn serializes_flat_with_iso_completion_time() {
        let timer = Timer::create(NewTimer::new("Focus", 1, Category::Study))
            .unwrap()
            .with_status(TimerStatus::Running)
            .ticked();
        let at = Utc.with_ymd_and_hms(2023, 8, 25, 10, 30, 0).unwrap();
        let entry = HistoryEntry::completed(&timer, at);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["name"], "Focus");
        assert_eq!(json["status"], "Completed");
        assert_eq!(json["remainingTime"], 0);
        assert_eq!(json["completionTime"], "2023-08-25T10:30:00Z");

        let back: HistoryEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
