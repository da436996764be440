//! Completion alert background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::TimerEngine;

/// Background task that surfaces each timer completion as an alert
pub async fn completion_alert_task(engine: Arc<TimerEngine>) {
    info!("Starting completion alert task");

    let mut completions = engine.subscribe_completions();
    drop(engine);

    loop {
        match completions.recv().await {
            Ok(entry) => {
                info!(
                    "Timer '{}' ({}) finished at {}",
                    entry.timer.name,
                    entry.category(),
                    entry.completion_time.to_rfc3339()
                );
            }
            Err(RecvError::Lagged(missed)) => {
                warn!("Completion alerts lagged, {} alert(s) skipped", missed);
            }
            Err(RecvError::Closed) => {
                info!("Completion channel closed, stopping alert task");
                break;
            }
        }
    }
}
