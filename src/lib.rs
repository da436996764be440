//! Countdown Keeper - A state-managed HTTP server for countdown timers
//!
//! This library provides the timer lifecycle engine (start, pause, reset and
//! per-timer one-second countdowns), the repository that persists timers and
//! their completion history to a key-value store, and the HTTP surface.

pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{StoreError, TimerError, ValidationError};
pub use state::{AppState, TimerEngine};
pub use storage::{FileStore, KeyValueStore, MemoryStore, TimerRepository};
pub use utils::signals::shutdown_signal;
