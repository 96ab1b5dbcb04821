//! Error types for the stagewatch client.
//!
//! Stage-level failures are always surfaced to the caller (and from there to
//! the notification sink); scheduler-level and cache-level failures are
//! recovered locally and never reach this taxonomy.

use thiserror::Error;

use crate::core::{EntityId, StageId, StageStatus};

/// The main error type for stagewatch operations.
#[derive(Debug, Error)]
pub enum StagewatchError {
    /// A state-machine transition was rejected.
    #[error("{0}")]
    Transition(#[from] TransitionRejected),

    /// A backend call failed in transit.
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The entity is not present in the store.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// A start for this (entity, stage) pair is already in flight.
    #[error("start already pending for entity {entity} stage {stage}")]
    StartPending {
        /// The entity the duplicate start targeted.
        entity: EntityId,
        /// The stage the duplicate start targeted.
        stage: StageId,
    },

    /// A sequential run was aborted before reaching the last stage.
    #[error("run aborted at stage {stage}: {reason}")]
    RunAborted {
        /// The stage at which the run stopped.
        stage: StageId,
        /// Why the run stopped (failure detail or timeout).
        reason: String,
    },

    /// A generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StagewatchError {
    /// Wraps a transport-level failure, preserving the upstream detail.
    #[must_use]
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Rejection reasons from the pipeline state machine.
///
/// A rejection leaves the stage state unchanged; it is a signal, not a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionRejected {
    /// `Start` was applied while the stage is already running.
    ///
    /// This is the re-entrancy guard against duplicate clicks and ticks.
    #[error("stage is already running")]
    AlreadyRunning,

    /// A server-side outcome event arrived while the stage was not running.
    #[error("event requires a running stage, current status is {status}")]
    NotRunning {
        /// The status the stage actually held.
        status: StageStatus,
    },
}
