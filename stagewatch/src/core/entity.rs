//! The product entity tracked by the dashboard client.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::progress::StageProgress;
use super::record::ResultRecord;
use super::stage::{StageId, STAGE_COUNT};
use super::status::StageStatus;

/// Opaque unique identifier for a product entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The full state of one pipeline stage on one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    /// Current execution status.
    pub status: StageStatus,
    /// Optional in-flight progress, meaningful while running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<StageProgress>,
    /// Error detail when the status is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageState {
    /// A stage that has never run.
    #[must_use]
    pub fn pending() -> Self {
        Self::default()
    }

    /// A stage that is currently running.
    #[must_use]
    pub fn running() -> Self {
        Self {
            status: StageStatus::Running,
            progress: None,
            error: None,
        }
    }

    /// A stage that completed successfully.
    #[must_use]
    pub fn completed() -> Self {
        Self {
            status: StageStatus::Completed,
            progress: None,
            error: None,
        }
    }

    /// A stage that failed with the given detail.
    #[must_use]
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Error,
            progress: None,
            error: Some(detail.into()),
        }
    }
}

/// A product entity with its five stage states and diff baselines.
///
/// The `snapshots` slot per stage holds the last-known materialized output,
/// used by change detection; it is client-side state and survives refreshes
/// that carry statuses only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Per-stage execution state, in pipeline order.
    pub stages: [StageState; STAGE_COUNT],
    /// Last-known materialized output per stage, if ever observed.
    #[serde(default)]
    pub snapshots: [Option<Vec<ResultRecord>>; STAGE_COUNT],
}

impl Product {
    /// Creates a new entity with all stages pending.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            stages: Default::default(),
            snapshots: Default::default(),
        }
    }

    /// Returns the state of the given stage.
    #[must_use]
    pub fn stage(&self, stage: StageId) -> &StageState {
        &self.stages[stage.index()]
    }

    /// Replaces the state of the given stage.
    pub fn set_stage(&mut self, stage: StageId, state: StageState) {
        self.stages[stage.index()] = state;
    }

    /// Returns the stored output snapshot for the given stage.
    #[must_use]
    pub fn snapshot(&self, stage: StageId) -> Option<&Vec<ResultRecord>> {
        self.snapshots[stage.index()].as_ref()
    }

    /// Stores the output snapshot for the given stage.
    pub fn set_snapshot(&mut self, stage: StageId, records: Vec<ResultRecord>) {
        self.snapshots[stage.index()] = Some(records);
    }

    /// Returns true if any stage is currently running.
    #[must_use]
    pub fn any_running(&self) -> bool {
        self.stages.iter().any(|s| s.status.is_running())
    }

    /// Returns the first stage that has not completed, in pipeline order.
    #[must_use]
    pub fn first_incomplete(&self) -> Option<StageId> {
        StageId::ALL
            .into_iter()
            .find(|stage| self.stage(*stage).status != StageStatus::Completed)
    }
}
