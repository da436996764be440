//! Persistence module
//!
//! The key-value store abstraction, its implementations, and the repository
//! that maps timer and history collections onto it.

pub mod file;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export main types
pub use file::FileStore;
pub use memory::MemoryStore;
pub use repository::{TimerRepository, HISTORY_KEY, TIMERS_KEY};
pub use store::KeyValueStore;
