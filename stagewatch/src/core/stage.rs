//! The five ordered pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of stages in the pipeline.
pub const STAGE_COUNT: usize = 5;

/// One of the five ordered phases of the per-entity analysis pipeline.
///
/// Stage *i* conceptually consumes the output of stage *i-1*, but only the
/// sequential run orchestrator enforces that ordering; individual starts may
/// target any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Collects the raw inputs for the entity.
    Ingest,
    /// Augments the raw inputs with contextual data.
    Enrich,
    /// Runs the main analysis over the enriched inputs.
    Analyze,
    /// Scores and ranks the analysis findings.
    Score,
    /// Materializes the user-facing report; the terminal stage.
    Report,
}

impl StageId {
    /// All stages in pipeline order.
    pub const ALL: [Self; STAGE_COUNT] = [
        Self::Ingest,
        Self::Enrich,
        Self::Analyze,
        Self::Score,
        Self::Report,
    ];

    /// The terminal stage, whose output feeds change detection.
    pub const TERMINAL: Self = Self::Report;

    /// Returns the zero-based position of this stage.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Ingest => 0,
            Self::Enrich => 1,
            Self::Analyze => 2,
            Self::Score => 3,
            Self::Report => 4,
        }
    }

    /// Returns the stage at the given position, if in range.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Returns the stage after this one, or `None` for the terminal stage.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// Returns true if this is the last stage of the pipeline.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        *self == Self::TERMINAL
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest => write!(f, "ingest"),
            Self::Enrich => write!(f, "enrich"),
            Self::Analyze => write!(f, "analyze"),
            Self::Score => write!(f, "score"),
            Self::Report => write!(f, "report"),
        }
    }
}
