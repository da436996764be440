//! Timer record, its category and status, and the pure state transitions

use std::fmt;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Opaque timer identifier, stable for the timer's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(String);

impl TimerId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TimerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TimerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed classification used for grouping and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Workout,
    Study,
    Break,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 3] = [Category::Workout, Category::Study, Category::Break];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Workout => "Workout",
            Category::Study => "Study",
            Category::Break => "Break",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimerStatus {
    #[default]
    Paused,
    Running,
    Completed,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimerStatus::Paused => "Paused",
            TimerStatus::Running => "Running",
            TimerStatus::Completed => "Completed",
        };
        f.write_str(label)
    }
}

/// Unvalidated input for creating a timer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTimer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub duration: Option<i64>,
    #[serde(default)]
    pub category: Category,
}

/// Accept a duration as a JSON integer or as the digits typed into a form
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Whole(i64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Whole(secs)) => Ok(Some(secs)),
        Some(Seconds::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Seconds::Text(text)) => text.trim().parse().map(Some).map_err(|_| {
            D::Error::custom(format!(
                "duration must be a whole number of seconds, got {:?}",
                text
            ))
        }),
    }
}

impl NewTimer {
    pub fn new(name: impl Into<String>, duration: i64, category: Category) -> Self {
        Self {
            name: Some(name.into()),
            duration: Some(duration),
            category,
        }
    }
}

/// A named countdown with a fixed duration
///
/// Records are treated as immutable values: every transition returns a new
/// `Timer` instead of mutating in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredTimer")]
pub struct Timer {
    pub id: TimerId,
    pub name: String,
    pub duration: u64,
    pub category: Category,
    pub remaining_time: u64,
    pub status: TimerStatus,
}

impl Timer {
    /// Validate a draft and build a Paused timer with a fresh id
    pub fn create(draft: NewTimer) -> Result<Self, ValidationError> {
        let name = draft
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::EmptyName)?;

        let duration = match draft.duration {
            None => return Err(ValidationError::MissingDuration),
            Some(d) if d <= 0 => return Err(ValidationError::InvalidDuration(d)),
            Some(d) => d as u64,
        };

        Ok(Self {
            id: TimerId::generate(),
            name,
            duration,
            category: draft.category,
            remaining_time: duration,
            status: TimerStatus::Paused,
        })
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status == TimerStatus::Completed
    }

    /// Same timer with a different status
    pub fn with_status(&self, status: TimerStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Back to Paused with the full duration remaining
    pub fn reset(&self) -> Self {
        Self {
            remaining_time: self.duration,
            status: TimerStatus::Paused,
            ..self.clone()
        }
    }

    /// One second less; Completed once zero is reached
    pub fn ticked(&self) -> Self {
        let remaining_time = self.remaining_time.saturating_sub(1);
        let status = if remaining_time == 0 {
            TimerStatus::Completed
        } else {
            self.status
        };
        Self {
            remaining_time,
            status,
            ..self.clone()
        }
    }

    /// Fraction of the duration already elapsed, between 0.0 and 1.0
    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_time as f64 / self.duration as f64)
    }
}

/// On-disk shape of a timer; older records may lack `status` or `remainingTime`
///
/// Conversion rejects a zero duration and makes the status agree with the
/// remaining time: nothing left means Completed, and a Completed record with
/// time left comes back Paused.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTimer {
    id: TimerId,
    name: String,
    duration: u64,
    category: Category,
    #[serde(default)]
    remaining_time: Option<u64>,
    #[serde(default)]
    status: TimerStatus,
}

impl TryFrom<StoredTimer> for Timer {
    type Error = String;

    fn try_from(stored: StoredTimer) -> Result<Self, Self::Error> {
        if stored.duration == 0 {
            return Err(format!("timer {} has a zero duration", stored.id));
        }

        let remaining_time = stored
            .remaining_time
            .unwrap_or(stored.duration)
            .min(stored.duration);
        let status = match (remaining_time, stored.status) {
            (0, _) => TimerStatus::Completed,
            (_, TimerStatus::Completed) => TimerStatus::Paused,
            (_, status) => status,
        };

        Ok(Self {
            id: stored.id,
            name: stored.name,
            duration: stored.duration,
            category: stored.category,
            remaining_time,
            status,
        })
    }
}

/// Group timers into per-category sections
///
/// Sections follow `Category::ALL` order, empty categories are omitted and
/// timers keep their collection order inside a section.
pub fn group_by_category(timers: &[Timer]) -> Vec<(Category, Vec<Timer>)> {
    Category::ALL
        .iter()
        .filter_map(|category| {
            let members: Vec<Timer> = timers
                .iter()
                .filter(|t| t.category == *category)
                .cloned()
                .collect();
            (!members.is_empty()).then_some((*category, members))
        })
        .collect()
}
