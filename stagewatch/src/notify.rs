//! Notification sink trait and implementations.
//!
//! The sink is the seam to the external badge/toast system. This crate
//! raises events; the sink owns their persistence and read-state.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::core::{Notification, NotificationKind};

/// Receives notification events produced by the pipeline core.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: Notification);

    /// Emits an event without blocking the caller.
    ///
    /// Must never fail; used on the synchronous optimistic path.
    fn try_emit(&self, event: Notification);
}

/// A sink that discards all events. The default when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

#[async_trait]
impl NotificationSink for NoOpSink {
    async fn emit(&self, _event: Notification) {}

    fn try_emit(&self, _event: Notification) {}
}

/// A sink that logs events through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl LoggingSink {
    fn log(event: &Notification) {
        match event.kind {
            NotificationKind::Failed => {
                warn!(
                    entity = ?event.entity_id,
                    stage = ?event.stage,
                    detail = ?event.detail,
                    "pipeline notification: failed"
                );
            }
            _ => {
                info!(
                    entity = ?event.entity_id,
                    stage = ?event.stage,
                    kind = ?event.kind,
                    count_new = event.count_new,
                    count_changed = event.count_changed,
                    "pipeline notification"
                );
            }
        }
    }
}

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn emit(&self, event: Notification) {
        Self::log(&event);
    }

    fn try_emit(&self, event: Notification) {
        Self::log(&event);
    }
}

/// A collecting sink for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: RwLock<Vec<Notification>>,
}

impl CollectingSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<Notification> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns collected events of one kind.
    #[must_use]
    pub fn events_of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl NotificationSink for CollectingSink {
    async fn emit(&self, event: Notification) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: Notification) {
        self.events.write().push(event);
    }
}
