//! A scripted backend for exercising the client without a network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::backend::{PipelineBackend, StageDetail};
use crate::core::{EntityId, Product, ResultRecord, StageId, StageState};
use crate::errors::StagewatchError;

/// A stage outcome scheduled to land after a number of list fetches,
/// simulating server-side completion latency.
#[derive(Debug)]
struct PendingOutcome {
    entity: EntityId,
    stage: StageId,
    remaining_lists: usize,
    state: StageState,
}

/// A programmable [`PipelineBackend`] that records every call.
///
/// By default, executing a stage marks it running and flips it to
/// completed on the next list fetch. Per-stage scripts override that with
/// failure or with never completing at all.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    entities: Mutex<Vec<Product>>,
    report_results: Mutex<HashMap<EntityId, Vec<ResultRecord>>>,
    pending: Mutex<Vec<PendingOutcome>>,
    scripted_failures: Mutex<Vec<(EntityId, StageId)>>,
    scripted_stalls: Mutex<Vec<(EntityId, StageId)>>,
    list_calls: AtomicUsize,
    execute_calls: Mutex<Vec<(EntityId, StageId)>>,
    stop_calls: Mutex<Vec<(EntityId, StageId)>>,
    fail_next_list: AtomicBool,
    fail_execute: AtomicBool,
    fail_stop: AtomicBool,
}

impl ScriptedBackend {
    /// Creates a backend with no entities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entity list served by `list_entities`.
    pub fn set_entities(&self, entities: Vec<Product>) {
        *self.entities.lock() = entities;
    }

    /// Sets the terminal-stage results served for one entity.
    pub fn set_report_results(&self, entity: EntityId, results: Vec<ResultRecord>) {
        self.report_results.lock().insert(entity, results);
    }

    /// Makes the given stage end in `Error` instead of `Completed`.
    pub fn script_failure(&self, entity: EntityId, stage: StageId) {
        self.scripted_failures.lock().push((entity, stage));
    }

    /// Makes the given stage stay `Running` forever.
    pub fn script_never_completes(&self, entity: EntityId, stage: StageId) {
        self.scripted_stalls.lock().push((entity, stage));
    }

    /// Fails the next `list_entities` call with a transport error.
    pub fn fail_next_list(&self) {
        self.fail_next_list.store(true, Ordering::SeqCst);
    }

    /// Fails all `execute_stage` calls with a transport error.
    pub fn fail_execute(&self) {
        self.fail_execute.store(true, Ordering::SeqCst);
    }

    /// Fails all `stop_stage` calls with a transport error.
    pub fn fail_stop(&self) {
        self.fail_stop.store(true, Ordering::SeqCst);
    }

    /// Number of `list_entities` calls observed.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// All `execute_stage` calls observed, in order.
    #[must_use]
    pub fn execute_calls(&self) -> Vec<(EntityId, StageId)> {
        self.execute_calls.lock().clone()
    }

    /// All `stop_stage` calls observed, in order.
    #[must_use]
    pub fn stop_calls(&self) -> Vec<(EntityId, StageId)> {
        self.stop_calls.lock().clone()
    }

    fn set_stage(&self, entity: EntityId, stage: StageId, state: StageState) {
        let mut entities = self.entities.lock();
        if let Some(product) = entities.iter_mut().find(|p| p.id == entity) {
            product.set_stage(stage, state);
        }
    }

    fn apply_due_outcomes(&self) {
        let due: Vec<PendingOutcome> = {
            let mut pending = self.pending.lock();
            for outcome in pending.iter_mut() {
                outcome.remaining_lists = outcome.remaining_lists.saturating_sub(1);
            }
            let (due, rest): (Vec<_>, Vec<_>) = pending
                .drain(..)
                .partition(|o| o.remaining_lists == 0);
            *pending = rest;
            due
        };

        for outcome in due {
            self.set_stage(outcome.entity, outcome.stage, outcome.state);
        }
    }
}

#[async_trait]
impl PipelineBackend for ScriptedBackend {
    async fn list_entities(
        &self,
        _tenant: &str,
        _minimal: bool,
    ) -> Result<Vec<Product>, StagewatchError> {
        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            return Err(StagewatchError::Transport("scripted list failure".into()));
        }

        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.apply_due_outcomes();
        Ok(self.entities.lock().clone())
    }

    async fn stage_detail(
        &self,
        entity: EntityId,
        stage: StageId,
        _tenant: &str,
    ) -> Result<StageDetail, StagewatchError> {
        if stage == StageId::TERMINAL {
            if let Some(results) = self.report_results.lock().get(&entity) {
                return Ok(StageDetail {
                    results: results.clone(),
                    payload: None,
                    progress: None,
                });
            }
        }
        Ok(StageDetail::default())
    }

    async fn execute_stage(
        &self,
        entity: EntityId,
        stage: StageId,
        _tenant: &str,
    ) -> Result<(), StagewatchError> {
        self.execute_calls.lock().push((entity, stage));

        if self.fail_execute.load(Ordering::SeqCst) {
            return Err(StagewatchError::Transport(
                "scripted execute failure".into(),
            ));
        }

        self.set_stage(entity, stage, StageState::running());

        if self.scripted_stalls.lock().contains(&(entity, stage)) {
            return Ok(());
        }

        let state = if self.scripted_failures.lock().contains(&(entity, stage)) {
            StageState::failed("scripted stage failure")
        } else {
            StageState::completed()
        };
        self.pending.lock().push(PendingOutcome {
            entity,
            stage,
            remaining_lists: 1,
            state,
        });

        Ok(())
    }

    async fn stop_stage(
        &self,
        entity: EntityId,
        stage: StageId,
    ) -> Result<(), StagewatchError> {
        self.stop_calls.lock().push((entity, stage));

        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(StagewatchError::Transport("scripted stop failure".into()));
        }

        self.set_stage(entity, stage, StageState::failed("stopped by user"));
        Ok(())
    }
}
