//! # Stagewatch
//!
//! A dashboard client for a staged backend analysis pipeline.
//!
//! Stagewatch tracks product entities through a fixed five-stage pipeline
//! and keeps a local view of their progress in sync with the server:
//!
//! - **Pipeline state machine**: Pure per-stage transitions with explicit
//!   rejection of invalid moves
//! - **Optimistic updates**: Stage starts reflect locally before the
//!   network round-trip, with compensation on failure
//! - **Adaptive polling**: A debounced scheduler that fetches only while
//!   work is in flight, plus a visibility trigger
//! - **Change detection**: Content fingerprints over terminal-stage
//!   results surface new and changed items across refreshes
//! - **Sequential runs**: An orchestrator that drives all five stages in
//!   order and resumes past completed prefixes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagewatch::prelude::*;
//!
//! let store = Arc::new(EntityStore::new());
//! let refresher = Arc::new(RefreshCoordinator::new(
//!     backend, store.clone(), Cache::in_memory(), sink,
//!     "tenant-a", PollConfig::default(), CacheTtls::default(),
//! ));
//! refresher.refresh(RefreshKind::Manual).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod cache;
pub mod config;
pub mod controller;
pub mod core;
pub mod diff;
pub mod errors;
pub mod fingerprint;
pub mod machine;
pub mod notify;
pub mod observability;
pub mod orchestrator;
pub mod refresh;
pub mod scheduler;
pub mod store;
pub mod testing;
pub mod utils;

#[cfg(test)]
mod integration_tests;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{PipelineBackend, StageDetail};
    pub use crate::cache::{Cache, CacheBackend, InMemoryCacheBackend};
    pub use crate::config::{CacheTtls, OrchestratorConfig, PollConfig, StagewatchConfig};
    pub use crate::controller::OptimisticController;
    pub use crate::core::{
        EntityId, Notification, NotificationKind, Product, ResultRecord, StageId,
        StageState, StageStatus, STAGE_COUNT,
    };
    pub use crate::diff::{diff, DiffReport};
    pub use crate::errors::{StagewatchError, TransitionRejected};
    pub use crate::fingerprint::{fingerprint, Fingerprint};
    pub use crate::machine::{transition, Transition, TransitionEvent};
    pub use crate::notify::{CollectingSink, LoggingSink, NoOpSink, NotificationSink};
    pub use crate::orchestrator::{RunOrchestrator, RunReport, StepOutcome};
    pub use crate::refresh::{RefreshCoordinator, RefreshKind};
    pub use crate::scheduler::{PollScheduler, SchedulerHandle};
    pub use crate::store::{EntityPatch, EntityStore};
    pub use crate::utils::{iso_timestamp, unix_now, Timestamp};
}
