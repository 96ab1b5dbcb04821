//! The full-refresh coordinator.
//!
//! Every code path that re-fetches the entity list funnels through here:
//! scheduler ticks, visibility triggers, post-effect reconciliation, and the
//! orchestrator's wait loops. The coordinator owns the single "last fetch
//! time" watermark used by the debounce check, reconciles the store
//! (last-write-wins), rewrites the cache, and runs change detection over
//! the terminal stage output of completed entities.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

use crate::backend::PipelineBackend;
use crate::cache::{keys, Cache};
use crate::config::{CacheTtls, PollConfig};
use crate::core::{Notification, Product, StageId, StageStatus};
use crate::diff::diff;
use crate::errors::StagewatchError;
use crate::notify::NotificationSink;
use crate::store::{EntityPatch, EntityStore};
use crate::utils::unix_now;

/// What triggered a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// A periodic scheduler tick. Debounced, failures are silent.
    Tick,
    /// The host surface regained foreground visibility. Debounced,
    /// failures are silent.
    Focus,
    /// A deliberate user-initiated refresh. Bypasses the debounce window;
    /// failures surface.
    Manual,
    /// Background reconciliation (post-effect, orchestrator wait loops).
    /// Bypasses the debounce window so server truth lands promptly, but
    /// failures stay silent like any other routine polling hiccup.
    Reconcile,
}

impl RefreshKind {
    /// Whether this trigger is subject to the debounce window.
    #[must_use]
    pub fn is_debounced(&self) -> bool {
        matches!(self, Self::Tick | Self::Focus)
    }

    /// Whether a failure of this refresh is user-visible.
    #[must_use]
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Manual)
    }

    /// Short label for spans and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tick => "tick",
            Self::Focus => "focus",
            Self::Manual => "manual",
            Self::Reconcile => "reconcile",
        }
    }
}

struct InFlightReset<'a>(&'a AtomicBool);

impl Drop for InFlightReset<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Coordinates full entity refreshes for one tenant.
pub struct RefreshCoordinator {
    backend: Arc<dyn PipelineBackend>,
    store: Arc<EntityStore>,
    cache: Cache,
    sink: Arc<dyn NotificationSink>,
    tenant: String,
    poll: PollConfig,
    ttls: CacheTtls,
    last_fetch: Mutex<Option<f64>>,
    in_flight: AtomicBool,
}

impl RefreshCoordinator {
    /// Creates a coordinator.
    pub fn new(
        backend: Arc<dyn PipelineBackend>,
        store: Arc<EntityStore>,
        cache: Cache,
        sink: Arc<dyn NotificationSink>,
        tenant: impl Into<String>,
        poll: PollConfig,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            backend,
            store,
            cache,
            sink,
            tenant: tenant.into(),
            poll,
            ttls,
            last_fetch: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// The unix time of the most recently completed fetch, if any.
    #[must_use]
    pub fn last_fetch(&self) -> Option<f64> {
        *self.last_fetch.lock()
    }

    /// Seeds the store from the cached entity list for paint-then-refresh.
    ///
    /// Returns true if cached data was applied. A subsequent refresh
    /// overwrites it with server truth.
    pub async fn prime_from_cache(&self) -> bool {
        if !self.store.is_empty() {
            return false;
        }

        let cached: Option<Vec<Product>> = self
            .cache
            .get(keys::ENTITY_LIST, &self.tenant, self.ttls.entity_list_secs)
            .await;

        match cached {
            Some(list) if !list.is_empty() => {
                debug!(count = list.len(), "painting entity list from cache");
                self.store.reconcile(list);
                true
            }
            _ => false,
        }
    }

    /// Performs a full refresh.
    ///
    /// Returns `Ok(true)` if a fetch ran, `Ok(false)` if the trigger was
    /// dropped (debounce window, concurrent refresh, or a silently
    /// swallowed background failure). Debounced triggers within the window
    /// are dropped, never queued.
    pub async fn refresh(&self, kind: RefreshKind) -> Result<bool, StagewatchError> {
        let span = crate::observability::refresh_span(&self.tenant, kind.as_str());
        self.refresh_inner(kind).instrument(span).await
    }

    async fn refresh_inner(&self, kind: RefreshKind) -> Result<bool, StagewatchError> {
        let _reset = if kind.is_debounced() {
            let now = unix_now();
            if let Some(last) = self.last_fetch() {
                if now - last < self.poll.debounce_window_secs() {
                    debug!(?kind, "refresh dropped inside debounce window");
                    return Ok(false);
                }
            }
            if self.in_flight.swap(true, Ordering::SeqCst) {
                debug!(?kind, "refresh dropped, another is in flight");
                return Ok(false);
            }
            Some(InFlightReset(&self.in_flight))
        } else {
            None
        };

        let fresh = match self.backend.list_entities(&self.tenant, true).await {
            Ok(fresh) => fresh,
            Err(err) => {
                if kind.is_foreground() {
                    self.sink
                        .emit(Notification::refresh_failed(err.to_string()))
                        .await;
                    return Err(err);
                }
                // Routine polling hiccup: keep the previous in-memory state.
                debug!(?kind, error = %err, "background refresh failed, keeping stale view");
                return Ok(false);
            }
        };

        // Watermark is updated on completion, not on trigger.
        *self.last_fetch.lock() = Some(unix_now());

        self.store.reconcile(fresh);
        let list = self.store.list();
        self.cache.set(keys::ENTITY_LIST, &list, &self.tenant).await;

        self.detect_changes(&list).await;

        Ok(true)
    }

    /// Runs change detection over the terminal stage of completed entities.
    ///
    /// Each diff compares against the snapshot stored at the previous
    /// completion, then replaces it.
    async fn detect_changes(&self, list: &[Product]) {
        for product in list {
            if product.stage(StageId::TERMINAL).status != StageStatus::Completed {
                continue;
            }

            let detail = match self
                .backend
                .stage_detail(product.id, StageId::TERMINAL, &self.tenant)
                .await
            {
                Ok(detail) => detail,
                Err(err) => {
                    debug!(entity = %product.id, error = %err, "stage detail fetch failed, keeping previous snapshot");
                    continue;
                }
            };

            let previous = product.snapshot(StageId::TERMINAL).map(Vec::as_slice);
            let report = diff(previous, &detail.results);
            if !report.is_empty() {
                self.sink
                    .emit(Notification::results_changed(
                        product.id,
                        StageId::TERMINAL,
                        report.new_count,
                        report.changed_count,
                    ))
                    .await;
            }

            self.cache
                .set(
                    &keys::report_results(product.id),
                    &detail.results,
                    &self.tenant,
                )
                .await;

            if let Err(err) = self.store.apply_patch(
                product.id,
                EntityPatch::default().with_snapshot(StageId::TERMINAL, detail.results),
            ) {
                // Entity vanished between list and patch; nothing to roll back.
                warn!(entity = %product.id, error = %err, "snapshot patch skipped");
            }
        }
    }
}
