//! Notification events raised toward the external badge/toast system.
//!
//! This core produces notifications; persistence and read-state belong to
//! the sink, not to this crate.

use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::stage::StageId;
use crate::utils::iso_timestamp;

/// The category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A stage was optimistically started.
    Started,
    /// New result items appeared in a stage snapshot.
    New,
    /// Existing result items materially changed.
    Changed,
    /// A stage (or a full run) completed.
    Completed,
    /// A stage, run, or refresh failed.
    Failed,
}

/// A notification event produced by the pipeline core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// The entity the event concerns; absent for tenant-wide events such as
    /// a foreground refresh failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    /// The stage the event concerns, when stage-specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageId>,
    /// Event category.
    pub kind: NotificationKind,
    /// Number of newly observed result items.
    #[serde(default)]
    pub count_new: usize,
    /// Number of materially changed result items.
    #[serde(default)]
    pub count_changed: usize,
    /// Free-form detail (error text, label).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// When the event was raised (ISO 8601).
    pub timestamp: String,
}

impl Notification {
    fn base(entity_id: Option<EntityId>, stage: Option<StageId>, kind: NotificationKind) -> Self {
        Self {
            entity_id,
            stage,
            kind,
            count_new: 0,
            count_changed: 0,
            detail: None,
            timestamp: iso_timestamp(),
        }
    }

    /// A stage was optimistically started.
    #[must_use]
    pub fn started(entity_id: EntityId, stage: StageId) -> Self {
        Self::base(Some(entity_id), Some(stage), NotificationKind::Started)
    }

    /// A stage completed.
    #[must_use]
    pub fn completed(entity_id: EntityId, stage: StageId) -> Self {
        Self::base(Some(entity_id), Some(stage), NotificationKind::Completed)
    }

    /// A stage or run failed with the given detail.
    #[must_use]
    pub fn failed(entity_id: EntityId, stage: StageId, detail: impl Into<String>) -> Self {
        let mut event = Self::base(Some(entity_id), Some(stage), NotificationKind::Failed);
        event.detail = Some(detail.into());
        event
    }

    /// A foreground refresh failed; not tied to any single entity.
    #[must_use]
    pub fn refresh_failed(detail: impl Into<String>) -> Self {
        let mut event = Self::base(None, None, NotificationKind::Failed);
        event.detail = Some(detail.into());
        event
    }

    /// Results in a stage snapshot changed since the previous completion.
    ///
    /// The kind is `New` when anything new appeared, otherwise `Changed`.
    #[must_use]
    pub fn results_changed(
        entity_id: EntityId,
        stage: StageId,
        count_new: usize,
        count_changed: usize,
    ) -> Self {
        let kind = if count_new > 0 {
            NotificationKind::New
        } else {
            NotificationKind::Changed
        };
        let mut event = Self::base(Some(entity_id), Some(stage), kind);
        event.count_new = count_new;
        event.count_changed = count_changed;
        event
    }
}
