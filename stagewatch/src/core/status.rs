//! Stage status enum and terminality rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a single pipeline stage.
///
/// Exactly one status holds at a time. `Completed` and `Error` are terminal:
/// nothing moves out of them without an explicit new `Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has never run (or was reset) and is waiting to be started.
    Pending,
    /// Stage is currently running server-side.
    Running,
    /// Stage completed successfully.
    Completed,
    /// Stage failed.
    Error,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true if a `Start` transition may originate from this status.
    ///
    /// Re-runs are allowed from any terminal state; only `Running` blocks.
    #[must_use]
    pub fn can_start(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns true if the stage is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}
