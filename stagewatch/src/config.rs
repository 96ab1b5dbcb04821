//! Timing and TTL configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling scheduler timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between scheduler ticks, in milliseconds.
    pub tick_interval_ms: u64,
    /// Minimum elapsed time between two fetches, in milliseconds.
    pub debounce_window_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 5_000,
            debounce_window_ms: 2_000,
        }
    }
}

impl PollConfig {
    /// Sets the tick interval.
    #[must_use]
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    /// Sets the debounce window.
    #[must_use]
    pub fn with_debounce_window_ms(mut self, ms: u64) -> Self {
        self.debounce_window_ms = ms;
        self
    }

    /// The tick interval as a `Duration`.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// The debounce window in fractional seconds, for watermark arithmetic.
    #[must_use]
    pub fn debounce_window_secs(&self) -> f64 {
        self.debounce_window_ms as f64 / 1000.0
    }
}

/// Sequential run orchestrator timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Interval between status polls while waiting on a stage, in
    /// milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum polls per stage before the wait times out.
    pub max_attempts: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        // 120 attempts at 5s is a ten-minute ceiling per stage.
        Self {
            poll_interval_ms: 5_000,
            max_attempts: 120,
        }
    }
}

impl OrchestratorConfig {
    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// The poll interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Independent TTLs per cached data class, in fractional seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheTtls {
    /// The entity list; volatile, refreshed by every poll.
    pub entity_list_secs: f64,
    /// Terminal-stage result snapshots.
    pub report_results_secs: f64,
    /// Summary text.
    pub summary_secs: f64,
    /// Tenant metadata; the least volatile class.
    pub tenant_meta_secs: f64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            entity_list_secs: 5.0,
            report_results_secs: 30.0,
            summary_secs: 15.0,
            tenant_meta_secs: 30.0,
        }
    }
}

/// Top-level configuration for the stagewatch client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagewatchConfig {
    /// Polling scheduler timing.
    #[serde(default)]
    pub poll: PollConfig,
    /// Sequential run timing.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Cache TTLs.
    #[serde(default)]
    pub cache_ttls: CacheTtls,
}

impl StagewatchConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the poll timing.
    #[must_use]
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Replaces the orchestrator timing.
    #[must_use]
    pub fn with_orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    /// Replaces the cache TTLs.
    #[must_use]
    pub fn with_cache_ttls(mut self, ttls: CacheTtls) -> Self {
        self.cache_ttls = ttls;
        self
    }
}
