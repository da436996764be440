//! State management module
//!
//! Timer and history records, the timer engine that owns their live state,
//! and the server-level application state wrapping it.

pub mod app_state;
pub mod engine;
pub mod history;
pub mod recorder;
pub mod timer;

// Re-export main types
pub use app_state::AppState;
pub use engine::{TickOutcome, TimerEngine};
pub use history::HistoryEntry;
pub use recorder::HistoryRecorder;
pub use timer::{group_by_category, Category, NewTimer, Timer, TimerId, TimerStatus};
