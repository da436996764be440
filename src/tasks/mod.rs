//! Background tasks module
//!
//! Per-timer countdown tasks and the completion alert listener.

pub mod completion_alerts;
pub mod ticker;

// Re-export main functions
pub use completion_alerts::completion_alert_task;
