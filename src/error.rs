//! Error types shared by the engine, repository and store layers

use thiserror::Error;

use crate::state::{TimerId, TimerStatus};

/// Errors raised by timer operations
#[derive(Error, Debug)]
pub enum TimerError {
    /// The caller supplied an invalid timer definition
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No timer with this id exists
    #[error("Timer not found: {0}")]
    NotFound(TimerId),

    /// The requested transition is not allowed from the current status
    #[error("Cannot {action} timer {id} while it is {from}")]
    InvalidTransition {
        id: TimerId,
        from: TimerStatus,
        action: &'static str,
    },

    /// Writing to the persistent store failed; the operation was not applied
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

/// Reasons a new timer definition is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("timer name must not be empty")]
    EmptyName,

    #[error("timer duration is required")]
    MissingDuration,

    #[error("timer duration must be a positive number of seconds, got {0}")]
    InvalidDuration(i64),
}

/// Errors from the underlying key-value store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TimerError>;
