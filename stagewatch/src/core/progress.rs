//! In-flight progress reporting for a running stage.

use serde::{Deserialize, Serialize};

use crate::utils::iso_timestamp;

/// A single timestamped progress message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// When the message was recorded (ISO 8601).
    pub timestamp: String,
    /// The progress message.
    pub message: String,
}

/// Optional progress attached to a running stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    /// Completion percentage, clamped to 0..=100.
    pub percentage: u8,
    /// Label for the step currently executing.
    #[serde(default)]
    pub current_label: String,
    /// Ordered history of progress messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ProgressEntry>,
}

impl StageProgress {
    /// Creates a new progress record at the given percentage.
    #[must_use]
    pub fn new(percentage: u8, current_label: impl Into<String>) -> Self {
        Self {
            percentage: percentage.min(100),
            current_label: current_label.into(),
            history: Vec::new(),
        }
    }

    /// Appends a timestamped message to the history.
    pub fn push_message(&mut self, message: impl Into<String>) {
        self.history.push(ProgressEntry {
            timestamp: iso_timestamp(),
            message: message.into(),
        });
    }

    /// Updates the percentage, clamping to 100.
    pub fn set_percentage(&mut self, percentage: u8) {
        self.percentage = percentage.min(100);
    }
}
