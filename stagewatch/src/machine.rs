//! The per-stage state machine.
//!
//! Pure transition rules over [`StageState`]; no I/O and no clocks. The
//! optimistic controller and the refresh path both apply events through
//! here so the guards exist in exactly one place.

use crate::core::{ResultRecord, StageState, StageStatus};
use crate::errors::TransitionRejected;

/// An event applied to one stage of one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionEvent {
    /// Optimistically mark the stage running before any network I/O.
    Start,
    /// The server reported completion with the materialized output.
    ServerCompleted(Vec<ResultRecord>),
    /// The server reported failure with a reason.
    ServerFailed(String),
    /// User-initiated cancellation; forces the stage out of `Running`.
    Stopped,
}

/// The outcome of an accepted transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The stage state after the event.
    pub state: StageState,
    /// Output to persist as the stage's snapshot, for `ServerCompleted`.
    pub snapshot: Option<Vec<ResultRecord>>,
}

impl Transition {
    fn state_only(state: StageState) -> Self {
        Self {
            state,
            snapshot: None,
        }
    }
}

/// Applies an event to a stage state.
///
/// Rules:
/// - `Start` from `Running` is rejected with `AlreadyRunning` (re-entrancy
///   guard); from any other status it yields `Running` immediately.
/// - `ServerCompleted` / `ServerFailed` are accepted only while `Running`;
///   from anywhere else the rejection carries the actual status and the
///   state is left unchanged.
/// - `Stopped` from `Running` forces a terminal `Error` state marked as
///   stopped by the user; from any other status it is an accepted no-op,
///   since stop races with server-side completion are best-effort.
pub fn transition(
    current: &StageState,
    event: TransitionEvent,
) -> Result<Transition, TransitionRejected> {
    match event {
        TransitionEvent::Start => {
            if current.status.is_running() {
                return Err(TransitionRejected::AlreadyRunning);
            }
            Ok(Transition::state_only(StageState::running()))
        }
        TransitionEvent::ServerCompleted(records) => {
            require_running(current)?;
            Ok(Transition {
                state: StageState::completed(),
                snapshot: Some(records),
            })
        }
        TransitionEvent::ServerFailed(reason) => {
            require_running(current)?;
            Ok(Transition::state_only(StageState::failed(reason)))
        }
        TransitionEvent::Stopped => {
            if current.status.is_running() {
                Ok(Transition::state_only(StageState::failed(
                    "stopped by user",
                )))
            } else {
                Ok(Transition::state_only(current.clone()))
            }
        }
    }
}

fn require_running(current: &StageState) -> Result<(), TransitionRejected> {
    if current.status.is_running() {
        Ok(())
    } else {
        Err(TransitionRejected::NotRunning {
            status: current.status,
        })
    }
}
