//! The optimistic update controller.
//!
//! Applies the `Start` transition synchronously so the UI reflects
//! "running" before any network I/O, runs the background effect on the
//! runtime, and reconciles on completion: a successful effect triggers a
//! full refresh (server truth wins over the client-predicted payload), a
//! failed effect applies the compensating `ServerFailed` transition. The
//! per-(entity, stage) guard makes duplicate starts a rejection, and is
//! cleared on every exit path.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::PipelineBackend;
use crate::core::{EntityId, Notification, StageId, StageState};
use crate::errors::StagewatchError;
use crate::machine::TransitionEvent;
use crate::notify::NotificationSink;
use crate::refresh::{RefreshCoordinator, RefreshKind};
use crate::store::EntityStore;

type PendingKey = (EntityId, StageId);

/// Clears the pending guard on drop, the finally-equivalent.
struct PendingGuard {
    map: Arc<DashMap<PendingKey, ()>>,
    key: PendingKey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

/// Drives optimistic stage starts and their background reconciliation.
pub struct OptimisticController {
    store: Arc<EntityStore>,
    backend: Arc<dyn PipelineBackend>,
    sink: Arc<dyn NotificationSink>,
    refresher: Arc<RefreshCoordinator>,
    pending: Arc<DashMap<PendingKey, ()>>,
}

impl OptimisticController {
    /// Creates a controller.
    pub fn new(
        store: Arc<EntityStore>,
        backend: Arc<dyn PipelineBackend>,
        sink: Arc<dyn NotificationSink>,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            store,
            backend,
            sink,
            refresher,
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Returns true if a start for this pair is currently in flight.
    #[must_use]
    pub fn is_pending(&self, entity: EntityId, stage: StageId) -> bool {
        self.pending.contains_key(&(entity, stage))
    }

    /// Starts a stage optimistically and runs `effect` in the background.
    ///
    /// Synchronous part: rejects if a start for `(entity, stage)` is
    /// already pending or the stage is already running, flips local state
    /// to `Running`, and emits an informational notification. The returned
    /// handle resolves when background reconciliation has finished.
    pub fn execute<F, Fut>(
        &self,
        entity: EntityId,
        stage: StageId,
        effect: F,
    ) -> Result<JoinHandle<()>, StagewatchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let key = (entity, stage);
        let guard = match self.pending.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(StagewatchError::StartPending { entity, stage });
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(());
                PendingGuard {
                    map: self.pending.clone(),
                    key,
                }
            }
        };

        // Optimistic transition before any I/O; the guard drops (and
        // clears the pending key) if the machine rejects it.
        self.store
            .transition(entity, stage, TransitionEvent::Start)?;

        self.sink.try_emit(Notification::started(entity, stage));

        let store = self.store.clone();
        let sink = self.sink.clone();
        let refresher = self.refresher.clone();

        let handle = tokio::spawn(async move {
            // Guard lives for the whole reconciliation.
            let _guard = guard;

            match effect().await {
                Ok(()) => {
                    // The authoritative stage result lives server-side;
                    // re-fetch instead of trusting the success payload.
                    if let Err(err) = refresher.refresh(RefreshKind::Reconcile).await {
                        debug!(%entity, %stage, error = %err, "post-effect refresh failed");
                    }
                }
                Err(err) => {
                    let detail = err.to_string();
                    if let Err(reject) = store.transition(
                        entity,
                        stage,
                        TransitionEvent::ServerFailed(detail.clone()),
                    ) {
                        // A refresh may have reconciled the stage already.
                        debug!(%entity, %stage, error = %reject, "failure transition skipped");
                    }
                    sink.emit(Notification::failed(entity, stage, detail)).await;
                }
            }
        });

        Ok(handle)
    }

    /// Stops a running stage.
    ///
    /// Advisory: the backend is asked to cancel, local status is forced out
    /// of `Running` immediately, and a later refresh is the authority on
    /// what actually happened.
    pub async fn stop(
        &self,
        entity: EntityId,
        stage: StageId,
    ) -> Result<StageState, StagewatchError> {
        if let Err(err) = self.backend.stop_stage(entity, stage).await {
            warn!(%entity, %stage, error = %err, "stop request failed, forcing local state anyway");
        }
        self.store.transition(entity, stage, TransitionEvent::Stopped)
    }
}
