//! External collaborator seams.
//!
//! The exact transport is out of scope; the dashboard core talks to the
//! analysis backend only through [`PipelineBackend`]. Completion of a stage
//! is never observed from the execute ack, only via subsequent fetches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{EntityId, Product, ResultRecord, StageId, StageProgress};
use crate::errors::StagewatchError;

/// Full per-stage detail, fetched lazily.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageDetail {
    /// Normalized result items for the stage.
    #[serde(default)]
    pub results: Vec<ResultRecord>,
    /// The raw stage payload, when the caller needs it verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Current progress, when the stage is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<StageProgress>,
}

/// The asynchronous analysis backend.
#[async_trait]
pub trait PipelineBackend: Send + Sync {
    /// Lists the tenant's entities.
    ///
    /// With `minimal`, the payload carries statuses and summaries only (no
    /// full stage payloads); used for list views and polling.
    async fn list_entities(
        &self,
        tenant: &str,
        minimal: bool,
    ) -> Result<Vec<Product>, StagewatchError>;

    /// Fetches full detail for one stage of one entity.
    async fn stage_detail(
        &self,
        entity: EntityId,
        stage: StageId,
        tenant: &str,
    ) -> Result<StageDetail, StagewatchError>;

    /// Requests execution of a stage. Fire-and-forget: the ack says the
    /// request was accepted, not that the stage finished.
    async fn execute_stage(
        &self,
        entity: EntityId,
        stage: StageId,
        tenant: &str,
    ) -> Result<(), StagewatchError>;

    /// Requests cancellation of a running stage. Advisory only.
    async fn stop_stage(&self, entity: EntityId, stage: StageId)
        -> Result<(), StagewatchError>;
}
