//! Per-timer countdown task

use std::{sync::Weak, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error};

use crate::{
    error::TimerError,
    state::{TickOutcome, TimerEngine, TimerId},
};

/// Spawn the countdown for one Running timer
///
/// The first tick fires one `period` after spawning. The task ends when the
/// timer completes, when the engine reports the tick as stale, or when the
/// engine itself is gone. Callers cancel it early with `JoinHandle::abort`.
pub(crate) fn spawn_ticker(
    engine_ref: Weak<TimerEngine>,
    id: TimerId,
    ticket: u64,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Ticker {} started for timer {}", ticket, id);

        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let Some(engine) = engine_ref.upgrade() else {
                debug!("Engine dropped, stopping ticker for timer {}", id);
                break;
            };

            match engine.scheduled_tick(&id, ticket).await {
                Ok(TickOutcome::Decremented(_)) => {}
                Ok(TickOutcome::Completed(_)) => break,
                Ok(TickOutcome::Ignored) => {
                    debug!("Ticker {} for timer {} is stale, stopping", ticket, id);
                    break;
                }
                Err(TimerError::NotFound(_)) => {
                    debug!("Timer {} no longer exists, stopping ticker", id);
                    break;
                }
                Err(e) => {
                    // Nothing was committed; the next tick retries
                    error!("Tick failed for timer {}: {}", id, e);
                }
            }
        }
    })
}
