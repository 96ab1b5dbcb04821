//! Adaptive polling scheduler.
//!
//! A fixed-interval tick that fetches only while some stage is in flight,
//! bounding backend load to active work. The tick reads the store through
//! its accessor on every pass (never a captured snapshot), and the
//! "should I act" predicate is a pure function testable without timers.
//! An independent visibility trigger covers runtimes that suspend
//! background timers.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::PollConfig;
use crate::refresh::{RefreshCoordinator, RefreshKind};
use crate::store::EntityStore;
use crate::utils::unix_now;

/// Decides whether a scheduler tick should trigger a fetch.
///
/// True iff some stage is running and at least the debounce window has
/// elapsed since the last completed fetch.
#[must_use]
pub fn should_poll(
    any_running: bool,
    last_fetch: Option<f64>,
    now: f64,
    debounce_secs: f64,
) -> bool {
    if !any_running {
        return false;
    }
    match last_fetch {
        None => true,
        Some(last) => now - last >= debounce_secs,
    }
}

/// The recurring background poller.
pub struct PollScheduler {
    store: Arc<EntityStore>,
    refresher: Arc<RefreshCoordinator>,
    poll: PollConfig,
}

/// Controls a spawned scheduler loop.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the loop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl PollScheduler {
    /// Creates a scheduler.
    pub fn new(
        store: Arc<EntityStore>,
        refresher: Arc<RefreshCoordinator>,
        poll: PollConfig,
    ) -> Self {
        Self {
            store,
            refresher,
            poll,
        }
    }

    /// One scheduler pass. Returns true if a fetch was issued.
    ///
    /// A no-op whenever nothing is running or the debounce window has not
    /// elapsed.
    pub async fn tick(&self) -> bool {
        let now = unix_now();
        if !should_poll(
            self.store.any_running(),
            self.refresher.last_fetch(),
            now,
            self.poll.debounce_window_secs(),
        ) {
            return false;
        }

        match self.refresher.refresh(RefreshKind::Tick).await {
            Ok(ran) => ran,
            Err(err) => {
                // Tick failures never escalate; refresh handles its own policy.
                debug!(error = %err, "tick refresh failed");
                false
            }
        }
    }

    /// The visibility/focus trigger: a debounced refresh when the host
    /// surface regains foreground, regardless of running state.
    pub async fn notify_visible(&self) -> bool {
        matches!(self.refresher.refresh(RefreshKind::Focus).await, Ok(true))
    }

    /// Spawns the recurring tick loop on the runtime.
    #[must_use]
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown, mut rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.poll.tick_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    _ = rx.changed() => break,
                }
            }
        });

        SchedulerHandle { shutdown, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::config::CacheTtls;
    use crate::core::StageStatus;
    use crate::notify::CollectingSink;
    use crate::testing::{product_with_statuses, ScriptedBackend};

    #[test]
    fn test_should_poll_requires_running_work() {
        assert!(!should_poll(false, None, 100.0, 2.0));
        assert!(!should_poll(false, Some(0.0), 100.0, 2.0));
        assert!(should_poll(true, None, 100.0, 2.0));
    }

    #[test]
    fn test_should_poll_debounce_boundary() {
        assert!(!should_poll(true, Some(100.0), 101.9, 2.0));
        assert!(should_poll(true, Some(100.0), 102.0, 2.0));
        assert!(should_poll(true, Some(100.0), 150.0, 2.0));
    }

    fn scheduler_fixture(
        statuses: [StageStatus; 5],
        debounce_ms: u64,
    ) -> (Arc<ScriptedBackend>, PollScheduler) {
        let backend = Arc::new(ScriptedBackend::new());
        let store = Arc::new(EntityStore::new());
        let product = product_with_statuses(statuses);
        store.insert(product.clone());
        backend.set_entities(vec![product]);

        let poll = PollConfig::default()
            .with_tick_interval_ms(5)
            .with_debounce_window_ms(debounce_ms);
        let refresher = Arc::new(RefreshCoordinator::new(
            backend.clone(),
            store.clone(),
            Cache::in_memory(),
            Arc::new(CollectingSink::new()),
            "tenant-a",
            poll,
            CacheTtls::default(),
        ));

        let scheduler = PollScheduler::new(store, refresher, poll);
        (backend, scheduler)
    }

    #[tokio::test]
    async fn test_tick_is_silent_when_nothing_runs() {
        let (backend, scheduler) = scheduler_fixture([StageStatus::Completed; 5], 0);

        assert!(!scheduler.tick().await);
        assert!(!scheduler.tick().await);
        assert_eq!(backend.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_tick_fetches_while_running() {
        let (backend, scheduler) = scheduler_fixture([StageStatus::Running; 5], 0);

        assert!(scheduler.tick().await);
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_two_triggers_inside_window_issue_one_fetch() {
        let (backend, scheduler) = scheduler_fixture([StageStatus::Running; 5], 60_000);

        assert!(scheduler.tick().await);
        // Focus trigger lands immediately after, inside the window.
        assert!(!scheduler.notify_visible().await);
        assert!(!scheduler.tick().await);
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_visibility_trigger_fetches_even_when_idle() {
        let (backend, scheduler) = scheduler_fixture([StageStatus::Completed; 5], 0);

        assert!(scheduler.notify_visible().await);
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_spawned_loop_ticks_and_shuts_down() {
        let (backend, scheduler) = scheduler_fixture([StageStatus::Running; 5], 0);

        let handle = Arc::new(scheduler).spawn();
        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        handle.shutdown().await;

        assert!(backend.list_calls() >= 1);
    }
}
