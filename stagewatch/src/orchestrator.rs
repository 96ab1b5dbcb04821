//! The sequential run orchestrator.
//!
//! Runs all five stages in strict order, waiting for each to reach a
//! terminal state before advancing. Every stage goes through the same
//! generic step (start, then poll until terminal with a bounded attempt
//! count), so the timeout logic exists once. Polling checks authoritative
//! per-entity status via a full refresh on each attempt; on failure or
//! timeout the run aborts with one aggregate failure notification and
//! subsequent stages are never started.

use std::sync::Arc;
use tracing::{debug, info, Instrument};

use crate::backend::PipelineBackend;
use crate::config::OrchestratorConfig;
use crate::controller::OptimisticController;
use crate::core::{EntityId, Notification, StageId, StageStatus};
use crate::errors::StagewatchError;
use crate::notify::NotificationSink;
use crate::refresh::{RefreshCoordinator, RefreshKind};
use crate::store::EntityStore;

/// The outcome of one stage within a sequential run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The stage reached `Completed` during this run.
    Completed,
    /// The stage was already `Completed` when the run reached it.
    Skipped,
    /// The stage reached `Error`; carries the failure detail.
    Failed(String),
    /// The stage never reached a terminal state within the attempt budget.
    TimedOut,
}

impl StepOutcome {
    fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// Summary of a sequential run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The entity the run targeted.
    pub entity: EntityId,
    /// Per-stage outcomes, in the order they were visited. Shorter than
    /// five entries when the run aborted early.
    pub outcomes: Vec<(StageId, StepOutcome)>,
}

impl RunReport {
    /// Returns true if all five stages ended completed or skipped.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcomes.len() == StageId::ALL.len()
            && self.outcomes.iter().all(|(_, o)| o.is_success())
    }

    /// The stage at which the run aborted, if it did.
    #[must_use]
    pub fn aborted_at(&self) -> Option<StageId> {
        self.outcomes
            .iter()
            .find(|(_, o)| !o.is_success())
            .map(|(stage, _)| *stage)
    }
}

/// Drives a full sequential pipeline run for one entity.
pub struct RunOrchestrator {
    store: Arc<EntityStore>,
    backend: Arc<dyn PipelineBackend>,
    controller: Arc<OptimisticController>,
    refresher: Arc<RefreshCoordinator>,
    sink: Arc<dyn NotificationSink>,
    tenant: String,
    config: OrchestratorConfig,
}

impl RunOrchestrator {
    /// Creates an orchestrator.
    pub fn new(
        store: Arc<EntityStore>,
        backend: Arc<dyn PipelineBackend>,
        controller: Arc<OptimisticController>,
        refresher: Arc<RefreshCoordinator>,
        sink: Arc<dyn NotificationSink>,
        tenant: impl Into<String>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            backend,
            controller,
            refresher,
            sink,
            tenant: tenant.into(),
            config,
        }
    }

    /// Runs stage 0 through 4 in order.
    ///
    /// Stages already `Completed` when the run reaches them are skipped, so
    /// re-invoking after a partial failure resumes from the first
    /// incomplete stage. On the first failure or timeout the run aborts,
    /// one aggregate failure notification is emitted, and the report stops
    /// at the aborted stage.
    pub async fn run_all(&self, entity: EntityId) -> Result<RunReport, StagewatchError> {
        let span = crate::observability::run_span(&self.tenant, &entity.to_string());
        self.run_all_inner(entity).instrument(span).await
    }

    async fn run_all_inner(&self, entity: EntityId) -> Result<RunReport, StagewatchError> {
        let mut report = RunReport {
            entity,
            outcomes: Vec::with_capacity(StageId::ALL.len()),
        };

        for stage in StageId::ALL {
            let state = self.store.stage_state(entity, stage)?;
            if state.status == StageStatus::Completed {
                debug!(%entity, %stage, "stage already completed, skipping");
                report.outcomes.push((stage, StepOutcome::Skipped));
                continue;
            }

            let outcome = self.run_step(entity, stage).await;
            if !outcome.is_success() {
                let reason = if let StepOutcome::Failed(detail) = &outcome {
                    detail.clone()
                } else {
                    format!(
                        "no terminal state after {} attempts",
                        self.config.max_attempts
                    )
                };
                report.outcomes.push((stage, outcome));
                self.sink
                    .emit(Notification::failed(entity, stage, reason))
                    .await;
                return Ok(report);
            }
            report.outcomes.push((stage, outcome));
        }

        info!(%entity, "sequential run completed");
        Ok(report)
    }

    /// One generic step: start the stage, then poll until terminal.
    async fn run_step(&self, entity: EntityId, stage: StageId) -> StepOutcome {
        let backend = self.backend.clone();
        let tenant = self.tenant.clone();

        match self.controller.execute(entity, stage, move || async move {
            backend
                .execute_stage(entity, stage, &tenant)
                .await
                .map_err(anyhow::Error::new)
        }) {
            Ok(_handle) => {}
            Err(StagewatchError::StartPending { .. } | StagewatchError::Transition(_)) => {
                // Already in flight through another entry point; wait on it.
                debug!(%entity, %stage, "stage already starting, waiting for terminal state");
            }
            Err(err) => return StepOutcome::Failed(err.to_string()),
        }

        self.poll_until_terminal(entity, stage).await
    }

    /// Bounded wait loop. Times out the wait, not the stage execution.
    async fn poll_until_terminal(&self, entity: EntityId, stage: StageId) -> StepOutcome {
        for _attempt in 0..self.config.max_attempts {
            tokio::time::sleep(self.config.poll_interval()).await;

            // Reconcile, not Manual: a transient hiccup here is a routine
            // polling failure, not a user-facing one.
            if let Err(err) = self.refresher.refresh(RefreshKind::Reconcile).await {
                debug!(%entity, %stage, error = %err, "status refresh failed, retrying");
            }

            match self.store.stage_state(entity, stage) {
                Ok(state) => match state.status {
                    StageStatus::Completed => return StepOutcome::Completed,
                    StageStatus::Error => {
                        return StepOutcome::Failed(
                            state.error.unwrap_or_else(|| "stage failed".to_string()),
                        )
                    }
                    StageStatus::Pending | StageStatus::Running => {}
                },
                Err(err) => return StepOutcome::Failed(err.to_string()),
            }
        }

        StepOutcome::TimedOut
    }
}
