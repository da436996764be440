//! Timer engine: the authoritative in-memory timer state and its countdowns
//!
//! Every operation takes the engine lock, builds a new collection, persists
//! it and only then swaps it in. The lock is held across the persist, so two
//! operations never read-modify-write the collection concurrently, and the
//! in-memory state never runs ahead of the store.
//!
//! ```text
//! Paused --start--> Running --tick x duration--> Completed
//!   ^                  |                             |
//!   +------pause-------+                             |
//!   +------------------------reset-------------------+
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use chrono::Utc;
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::{HistoryEntry, HistoryRecorder, NewTimer, Timer, TimerId, TimerStatus};
use crate::{
    error::{Result, StoreError, TimerError},
    storage::TimerRepository,
    tasks::ticker::spawn_ticker,
};

/// Result of applying one tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// One second was taken off a Running timer
    Decremented(Timer),
    /// The timer reached zero and its history entry was recorded
    Completed(HistoryEntry),
    /// The tick was late or stale and changed nothing
    Ignored,
}

/// Handle to a running countdown task
#[derive(Debug)]
struct Ticker {
    ticket: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct EngineInner {
    timers: Arc<Vec<Timer>>,
    tickers: HashMap<TimerId, Ticker>,
    next_ticket: u64,
}

impl EngineInner {
    fn find(&self, id: &TimerId) -> Result<Timer> {
        self.timers
            .iter()
            .find(|t| t.id == *id)
            .cloned()
            .ok_or_else(|| TimerError::NotFound(id.clone()))
    }

    /// Abort the countdown for `id`, returning whether one existed
    fn cancel_ticker(&mut self, id: &TimerId) -> bool {
        match self.tickers.remove(id) {
            Some(ticker) => {
                ticker.handle.abort();
                debug!("Cancelled ticker {} for timer {}", ticker.ticket, id);
                true
            }
            None => false,
        }
    }

    fn cancel_all(&mut self) {
        for (_, ticker) in self.tickers.drain() {
            ticker.handle.abort();
        }
    }

    /// Copy of the collection with `updated` in place of its old version
    fn replaced(&self, updated: &Timer) -> Vec<Timer> {
        self.timers
            .iter()
            .map(|t| if t.id == updated.id { updated.clone() } else { t.clone() })
            .collect()
    }
}

/// Owns all live timers and the mapping from timer id to countdown task
pub struct TimerEngine {
    repository: TimerRepository,
    recorder: HistoryRecorder,
    tick_period: Duration,
    inner: Mutex<EngineInner>,
    snapshot_tx: watch::Sender<Arc<Vec<Timer>>>,
    completion_tx: broadcast::Sender<HistoryEntry>,
    self_ref: Weak<TimerEngine>,
}

impl TimerEngine {
    /// Create an empty engine; call [`TimerEngine::load`] to populate it
    pub fn new(repository: TimerRepository, tick_period: Duration) -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(Arc::new(Vec::new()));
        let (completion_tx, _) = broadcast::channel(100);

        Arc::new_cyclic(|self_ref| Self {
            recorder: HistoryRecorder::new(repository.clone()),
            repository,
            tick_period,
            inner: Mutex::new(EngineInner::default()),
            snapshot_tx,
            completion_tx,
            self_ref: self_ref.clone(),
        })
    }

    /// Replace the in-memory state with the stored collection
    ///
    /// All countdowns are cancelled. Timers stored as Running belong to a
    /// previous session and come back Paused with their remaining time.
    pub async fn load(&self) -> Arc<Vec<Timer>> {
        let mut inner = self.inner.lock().await;
        inner.cancel_all();

        let stored = self.repository.load_timers().await;
        let interrupted = stored.iter().filter(|t| t.is_running()).count();
        let timers: Vec<Timer> = stored
            .into_iter()
            .map(|t| {
                if t.is_running() {
                    t.with_status(TimerStatus::Paused)
                } else {
                    t
                }
            })
            .collect();

        if interrupted > 0 {
            info!("Pausing {} timer(s) left running by a previous session", interrupted);
            if let Err(e) = self.repository.save_timers(&timers).await {
                warn!("Failed to persist paused timers after load: {}", e);
            }
        }

        info!("Loaded {} timer(s)", timers.len());
        let snapshot = Arc::new(timers);
        inner.timers = Arc::clone(&snapshot);
        self.snapshot_tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    /// Current immutable snapshot of all timers
    pub fn timers(&self) -> Arc<Vec<Timer>> {
        Arc::clone(&self.snapshot_tx.borrow())
    }

    pub fn get(&self, id: &TimerId) -> Option<Timer> {
        self.snapshot_tx.borrow().iter().find(|t| t.id == *id).cloned()
    }

    /// Watch every committed snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Timer>>> {
        self.snapshot_tx.subscribe()
    }

    /// Receive an entry each time a timer completes
    pub fn subscribe_completions(&self) -> broadcast::Receiver<HistoryEntry> {
        self.completion_tx.subscribe()
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.repository.load_history().await
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Number of countdown tasks currently registered
    pub async fn active_countdowns(&self) -> usize {
        self.inner.lock().await.tickers.len()
    }

    /// Validate and add a new Paused timer
    pub async fn create_timer(&self, draft: NewTimer) -> Result<Timer> {
        let mut inner = self.inner.lock().await;
        let (timer, timers) = self.repository.create_timer(&inner.timers, draft).await?;
        self.publish(&mut inner, timers);

        info!("Created timer '{}' ({}, {}s)", timer.name, timer.category, timer.duration);
        Ok(timer)
    }

    /// Begin counting down; a Running timer is left as is
    pub async fn start(&self, id: &TimerId) -> Result<Timer> {
        let mut inner = self.inner.lock().await;
        let current = inner.find(id)?;

        match current.status {
            TimerStatus::Running => {
                debug!("Timer {} already running", id);
                return Ok(current);
            }
            TimerStatus::Completed => {
                return Err(TimerError::InvalidTransition {
                    id: id.clone(),
                    from: current.status,
                    action: "start",
                });
            }
            TimerStatus::Paused if current.remaining_time == 0 => {
                return Err(TimerError::InvalidTransition {
                    id: id.clone(),
                    from: current.status,
                    action: "start",
                });
            }
            TimerStatus::Paused => {}
        }

        let started = current.with_status(TimerStatus::Running);
        let timers = inner.replaced(&started);
        self.commit(&mut inner, timers).await?;
        self.spawn_countdown(&mut inner, id);

        info!("Started timer '{}' with {}s remaining", started.name, started.remaining_time);
        Ok(started)
    }

    /// Stop counting down, keeping the remaining time
    pub async fn pause(&self, id: &TimerId) -> Result<Timer> {
        let mut inner = self.inner.lock().await;
        let current = inner.find(id)?;

        if current.is_completed() {
            return Err(TimerError::InvalidTransition {
                id: id.clone(),
                from: current.status,
                action: "pause",
            });
        }

        inner.cancel_ticker(id);
        if current.status == TimerStatus::Paused {
            debug!("Timer {} already paused", id);
            return Ok(current);
        }

        let paused = current.with_status(TimerStatus::Paused);
        let timers = inner.replaced(&paused);
        if let Err(e) = self.commit(&mut inner, timers).await {
            // Still Running in memory, so it needs its countdown back
            self.spawn_countdown(&mut inner, id);
            return Err(e.into());
        }

        info!("Paused timer '{}' at {}s remaining", paused.name, paused.remaining_time);
        Ok(paused)
    }

    /// Stop counting down and restore the full duration
    pub async fn reset(&self, id: &TimerId) -> Result<Timer> {
        let mut inner = self.inner.lock().await;
        let current = inner.find(id)?;

        inner.cancel_ticker(id);
        let reset = current.reset();
        if reset == current {
            debug!("Timer {} already reset", id);
            return Ok(current);
        }

        let timers = inner.replaced(&reset);
        if let Err(e) = self.commit(&mut inner, timers).await {
            if current.is_running() {
                self.spawn_countdown(&mut inner, id);
            }
            return Err(e.into());
        }

        info!("Reset timer '{}' to {}s", reset.name, reset.duration);
        Ok(reset)
    }

    /// Apply one tick to `id` directly, outside of its countdown task
    pub async fn tick(&self, id: &TimerId) -> Result<TickOutcome> {
        self.apply_tick(id, None).await
    }

    /// Tick issued by the countdown task holding `ticket`
    pub(crate) async fn scheduled_tick(&self, id: &TimerId, ticket: u64) -> Result<TickOutcome> {
        self.apply_tick(id, Some(ticket)).await
    }

    /// Cancel every countdown, leaving timer state untouched
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        let count = inner.tickers.len();
        inner.cancel_all();
        info!("Cancelled {} countdown(s)", count);
    }

    async fn apply_tick(&self, id: &TimerId, ticket: Option<u64>) -> Result<TickOutcome> {
        let mut inner = self.inner.lock().await;

        if let Some(ticket) = ticket {
            let current_ticket = inner.tickers.get(id).map(|t| t.ticket);
            if current_ticket != Some(ticket) {
                return Ok(TickOutcome::Ignored);
            }
        }

        let current = inner.find(id)?;
        if !current.is_running() || current.remaining_time == 0 {
            debug!("Ignoring tick for timer {} ({})", id, current.status);
            // A registered countdown with nothing left to count is dropped
            if let Some(ticker) = inner.tickers.remove(id) {
                if ticket.is_none() {
                    ticker.handle.abort();
                }
            }
            return Ok(TickOutcome::Ignored);
        }

        let ticked = current.ticked();
        let timers = inner.replaced(&ticked);
        self.commit(&mut inner, timers).await?;

        if !ticked.is_completed() {
            debug!("Timer {} at {}s", id, ticked.remaining_time);
            return Ok(TickOutcome::Decremented(ticked));
        }

        // The scheduled task ends itself on completion; only a direct tick
        // has to stop it
        if let Some(ticker) = inner.tickers.remove(id) {
            if ticket.is_none() {
                ticker.handle.abort();
            }
        }

        info!("Timer '{}' completed", ticked.name);
        let entry = match self.recorder.record_completion(&ticked).await {
            Ok(entry) => entry,
            Err(e) => {
                error!("Failed to record completion of timer {}: {}", id, e);
                HistoryEntry::completed(&ticked, Utc::now())
            }
        };
        drop(inner);

        if self.completion_tx.send(entry.clone()).is_err() {
            debug!("No completion listeners for timer {}", id);
        }
        Ok(TickOutcome::Completed(entry))
    }

    /// Persist `timers` and make them the current snapshot
    async fn commit(
        &self,
        inner: &mut EngineInner,
        timers: Vec<Timer>,
    ) -> std::result::Result<(), StoreError> {
        self.repository.save_timers(&timers).await?;
        self.publish(inner, timers);
        Ok(())
    }

    /// Make an already persisted collection the current snapshot
    fn publish(&self, inner: &mut EngineInner, timers: Vec<Timer>) {
        let snapshot = Arc::new(timers);
        inner.timers = Arc::clone(&snapshot);
        self.snapshot_tx.send_replace(snapshot);
    }

    fn spawn_countdown(&self, inner: &mut EngineInner, id: &TimerId) {
        inner.next_ticket += 1;
        let ticket = inner.next_ticket;
        let handle = spawn_ticker(self.self_ref.clone(), id.clone(), ticket, self.tick_period);
        if let Some(stale) = inner.tickers.insert(id.clone(), Ticker { ticket, handle }) {
            stale.handle.abort();
        }
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.inner.get_mut().cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::Category,
        storage::{KeyValueStore, MemoryStore, TIMERS_KEY},
    };

    // Long enough that scheduled ticks never interfere with direct ticks
    const IDLE_PERIOD: Duration = Duration::from_secs(3600);

    fn engine() -> Arc<TimerEngine> {
        TimerEngine::new(
            TimerRepository::new(Arc::new(MemoryStore::new())),
            IDLE_PERIOD,
        )
    }

    #[tokio::test]
    async fn unknown_id_is_reported() {
        let engine = engine();
        let ghost = TimerId::from("ghost");
        assert!(matches!(engine.start(&ghost).await, Err(TimerError::NotFound(_))));
        assert!(matches!(engine.pause(&ghost).await, Err(TimerError::NotFound(_))));
        assert!(matches!(engine.reset(&ghost).await, Err(TimerError::NotFound(_))));
        assert!(matches!(engine.tick(&ghost).await, Err(TimerError::NotFound(_))));
    }

    #[tokio::test]
    async fn tick_on_paused_timer_is_ignored() {
        let engine = engine();
        let timer = engine
            .create_timer(NewTimer::new("Read", 10, Category::Study))
            .await
            .unwrap();
        assert_eq!(engine.tick(&timer.id).await.unwrap(), TickOutcome::Ignored);
        assert_eq!(engine.get(&timer.id).unwrap().remaining_time, 10);
    }

    #[tokio::test]
    async fn completed_timer_only_leaves_via_reset() {
        let engine = engine();
        let timer = engine
            .create_timer(NewTimer::new("Sprint", 1, Category::Workout))
            .await
            .unwrap();
        engine.start(&timer.id).await.unwrap();
        assert!(matches!(
            engine.tick(&timer.id).await.unwrap(),
            TickOutcome::Completed(_)
        ));
        assert_eq!(engine.active_countdowns().await, 0);

        assert!(matches!(
            engine.start(&timer.id).await,
            Err(TimerError::InvalidTransition { action: "start", .. })
        ));
        assert!(matches!(
            engine.pause(&timer.id).await,
            Err(TimerError::InvalidTransition { action: "pause", .. })
        ));

        let reset = engine.reset(&timer.id).await.unwrap();
        assert_eq!(reset.status, TimerStatus::Paused);
        assert_eq!(reset.remaining_time, 1);
    }

    #[tokio::test]
    async fn load_pauses_timers_left_running() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                TIMERS_KEY,
                r#"[{"id":"1","name":"Walk","duration":20,"category":"Break","remainingTime":7,"status":"Running"}]"#
                    .into(),
            )
            .await
            .unwrap();

        let engine = TimerEngine::new(TimerRepository::new(store.clone()), IDLE_PERIOD);
        let timers = engine.load().await;
        assert_eq!(timers[0].status, TimerStatus::Paused);
        assert_eq!(timers[0].remaining_time, 7);
        assert_eq!(engine.active_countdowns().await, 0);

        let raw = store.get(TIMERS_KEY).await.unwrap().unwrap();
        assert!(raw.contains(r#""status":"Paused""#));
    }

    #[tokio::test]
    async fn drained_record_loads_completed_and_cannot_start() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                TIMERS_KEY,
                r#"[{"id":"d","name":"Drained","duration":5,"category":"Study","remainingTime":0,"status":"Paused"},
                    {"id":"u","name":"Unfinished","duration":5,"category":"Study","remainingTime":3,"status":"Completed"}]"#
                    .into(),
            )
            .await
            .unwrap();

        let engine = TimerEngine::new(TimerRepository::new(store), IDLE_PERIOD);
        let timers = engine.load().await;
        assert_eq!(timers[0].status, TimerStatus::Completed);
        assert_eq!(timers[1].status, TimerStatus::Paused);

        let drained = TimerId::from("d");
        assert!(matches!(
            engine.start(&drained).await,
            Err(TimerError::InvalidTransition { action: "start", .. })
        ));
        assert_eq!(engine.active_countdowns().await, 0);
        assert_eq!(engine.tick(&drained).await.unwrap(), TickOutcome::Ignored);
        assert!(engine.history().await.is_empty());

        // The unfinished one counts down normally
        let unfinished = TimerId::from("u");
        engine.start(&unfinished).await.unwrap();
        assert!(matches!(
            engine.tick(&unfinished).await.unwrap(),
            TickOutcome::Decremented(t) if t.remaining_time == 2
        ));
    }

    #[tokio::test]
    async fn zero_duration_collection_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                TIMERS_KEY,
                r#"[{"id":"z","name":"Zero","duration":0,"category":"Break"}]"#.into(),
            )
            .await
            .unwrap();

        let engine = TimerEngine::new(TimerRepository::new(store), IDLE_PERIOD);
        assert!(engine.load().await.is_empty());
    }

    #[tokio::test]
    async fn watchers_see_one_snapshot_per_commit() {
        let engine = engine();
        let mut snapshots = engine.subscribe();
        assert!(!snapshots.has_changed().unwrap());

        let timer = engine
            .create_timer(NewTimer::new("Run", 5, Category::Workout))
            .await
            .unwrap();
        assert!(snapshots.has_changed().unwrap());
        assert_eq!(snapshots.borrow_and_update().len(), 1);

        // A no-op commits nothing
        engine.pause(&timer.id).await.unwrap();
        assert!(!snapshots.has_changed().unwrap());

        engine.start(&timer.id).await.unwrap();
        assert!(snapshots.has_changed().unwrap());
        assert_eq!(snapshots.borrow_and_update()[0].status, TimerStatus::Running);

        engine.tick(&timer.id).await.unwrap();
        assert_eq!(snapshots.borrow_and_update()[0].remaining_time, 4);

        // Rejected input publishes nothing
        let _ = engine
            .create_timer(NewTimer::new("", 5, Category::Workout))
            .await;
        assert!(!snapshots.has_changed().unwrap());
    }

    #[tokio::test]
    async fn snapshots_are_not_mutated_by_later_operations() {
        let engine = engine();
        let timer = engine
            .create_timer(NewTimer::new("Run", 5, Category::Workout))
            .await
            .unwrap();
        let before = engine.timers();
        engine.start(&timer.id).await.unwrap();
        engine.tick(&timer.id).await.unwrap();

        assert_eq!(before[0].status, TimerStatus::Paused);
        assert_eq!(before[0].remaining_time, 5);
        assert_eq!(engine.timers()[0].remaining_time, 4);
    }

    #[tokio::test]
    async fn stale_ticket_is_ignored() {
        let engine = engine();
        let timer = engine
            .create_timer(NewTimer::new("Run", 5, Category::Workout))
            .await
            .unwrap();
        engine.start(&timer.id).await.unwrap();
        engine.pause(&timer.id).await.unwrap();
        engine.start(&timer.id).await.unwrap();

        // Ticket 1 belonged to the first, cancelled countdown
        assert_eq!(
            engine.scheduled_tick(&timer.id, 1).await.unwrap(),
            TickOutcome::Ignored
        );
        assert_eq!(engine.get(&timer.id).unwrap().remaining_time, 5);
        assert!(matches!(
            engine.scheduled_tick(&timer.id, 2).await.unwrap(),
            TickOutcome::Decremented(_)
        ));
    }
}
