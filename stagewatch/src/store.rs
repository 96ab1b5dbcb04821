//! The owned entity store.
//!
//! The in-memory entity list is the single mutable resource shared between
//! the scheduler, the controller, and the diff wiring. Every component
//! reads through the accessors here and none holds an independent copy, so
//! there is no stale-closure risk. All writes are whole-record replacements
//! keyed by entity id; refreshes are last-write-wins.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::core::{EntityId, Product, ResultRecord, StageId, StageState};
use crate::errors::StagewatchError;
use crate::machine::{self, TransitionEvent};

/// A partial update to one entity, applied atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPatch {
    /// Replacement stage states, by stage.
    pub stages: Vec<(StageId, StageState)>,
    /// Replacement output snapshots, by stage.
    pub snapshots: Vec<(StageId, Vec<ResultRecord>)>,
}

impl EntityPatch {
    /// A patch replacing one stage's state.
    #[must_use]
    pub fn stage(stage: StageId, state: StageState) -> Self {
        Self {
            stages: vec![(stage, state)],
            snapshots: Vec::new(),
        }
    }

    /// Adds a snapshot replacement to the patch.
    #[must_use]
    pub fn with_snapshot(mut self, stage: StageId, records: Vec<ResultRecord>) -> Self {
        self.snapshots.push((stage, records));
        self
    }
}

/// The owned, shared entity store with a single-writer patch interface.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: RwLock<HashMap<EntityId, Product>>,
}

impl EntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces one entity.
    pub fn insert(&self, product: Product) {
        self.entities.write().insert(product.id, product);
    }

    /// Returns a copy of the entity, if present.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<Product> {
        self.entities.read().get(&id).cloned()
    }

    /// Returns a copy of all entities.
    #[must_use]
    pub fn list(&self) -> Vec<Product> {
        self.entities.read().values().cloned().collect()
    }

    /// Returns the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if no entities are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Returns true if any stage of any entity is currently running.
    #[must_use]
    pub fn any_running(&self) -> bool {
        self.entities.read().values().any(Product::any_running)
    }

    /// Returns the status of one stage of one entity.
    pub fn stage_state(
        &self,
        id: EntityId,
        stage: StageId,
    ) -> Result<StageState, StagewatchError> {
        self.entities
            .read()
            .get(&id)
            .map(|p| p.stage(stage).clone())
            .ok_or(StagewatchError::UnknownEntity(id))
    }

    /// Applies a patch to one entity under a single write lock.
    pub fn apply_patch(&self, id: EntityId, patch: EntityPatch) -> Result<(), StagewatchError> {
        let mut entities = self.entities.write();
        let product = entities
            .get_mut(&id)
            .ok_or(StagewatchError::UnknownEntity(id))?;

        for (stage, state) in patch.stages {
            product.set_stage(stage, state);
        }
        for (stage, records) in patch.snapshots {
            product.set_snapshot(stage, records);
        }
        Ok(())
    }

    /// Applies a state-machine event to one stage, read-modify-write under
    /// one lock so concurrent transitions cannot interleave.
    pub fn transition(
        &self,
        id: EntityId,
        stage: StageId,
        event: TransitionEvent,
    ) -> Result<StageState, StagewatchError> {
        let mut entities = self.entities.write();
        let product = entities
            .get_mut(&id)
            .ok_or(StagewatchError::UnknownEntity(id))?;

        let outcome = machine::transition(product.stage(stage), event)?;
        product.set_stage(stage, outcome.state.clone());
        if let Some(records) = outcome.snapshot {
            product.set_snapshot(stage, records);
        }
        Ok(outcome.state)
    }

    /// Replaces the tracked set with a freshly fetched list, last-write-wins.
    ///
    /// Minimal fetches carry statuses only, so locally stored diff baselines
    /// are carried over for entities that persist across the refresh. The
    /// server is the authority on list membership.
    pub fn reconcile(&self, fresh: Vec<Product>) {
        let mut entities = self.entities.write();
        let mut next: HashMap<EntityId, Product> = HashMap::with_capacity(fresh.len());

        for mut product in fresh {
            if let Some(existing) = entities.get(&product.id) {
                for stage in StageId::ALL {
                    if product.snapshot(stage).is_none() {
                        if let Some(records) = existing.snapshot(stage) {
                            product.set_snapshot(stage, records.clone());
                        }
                    }
                }
            }
            next.insert(product.id, product);
        }

        *entities = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageStatus;

    fn stored(store: &EntityStore, name: &str) -> Product {
        let product = Product::new(name);
        let id = product.id;
        store.insert(product);
        store.get(id).unwrap()
    }

    #[test]
    fn test_insert_get_list() {
        let store = EntityStore::new();
        assert!(store.is_empty());

        let a = stored(&store, "a");
        let _b = stored(&store, "b");

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(a.id).unwrap().name, "a");
        assert!(store.get(EntityId::new()).is_none());
    }

    #[test]
    fn test_any_running_reflects_latest_writes() {
        let store = EntityStore::new();
        let product = stored(&store, "a");
        assert!(!store.any_running());

        store
            .apply_patch(
                product.id,
                EntityPatch::stage(StageId::Analyze, StageState::running()),
            )
            .unwrap();
        assert!(store.any_running());
    }

    #[test]
    fn test_apply_patch_unknown_entity() {
        let store = EntityStore::new();
        let err = store
            .apply_patch(
                EntityId::new(),
                EntityPatch::stage(StageId::Ingest, StageState::running()),
            )
            .unwrap_err();
        assert!(matches!(err, StagewatchError::UnknownEntity(_)));
    }

    #[test]
    fn test_transition_applies_machine_rules() {
        let store = EntityStore::new();
        let product = stored(&store, "a");

        let state = store
            .transition(product.id, StageId::Ingest, TransitionEvent::Start)
            .unwrap();
        assert_eq!(state.status, StageStatus::Running);

        // Second start is rejected and leaves state untouched.
        let err = store
            .transition(product.id, StageId::Ingest, TransitionEvent::Start)
            .unwrap_err();
        assert!(matches!(err, StagewatchError::Transition(_)));
        assert_eq!(
            store
                .stage_state(product.id, StageId::Ingest)
                .unwrap()
                .status,
            StageStatus::Running
        );
    }

    #[test]
    fn test_transition_completed_stores_snapshot() {
        let store = EntityStore::new();
        let product = stored(&store, "a");
        store
            .transition(product.id, StageId::Report, TransitionEvent::Start)
            .unwrap();

        let records = vec![ResultRecord::new("r", "t", "2024-01-01", "d")];
        store
            .transition(
                product.id,
                StageId::Report,
                TransitionEvent::ServerCompleted(records.clone()),
            )
            .unwrap();

        let after = store.get(product.id).unwrap();
        assert_eq!(after.stage(StageId::Report).status, StageStatus::Completed);
        assert_eq!(after.snapshot(StageId::Report), Some(&records));
    }

    #[test]
    fn test_reconcile_carries_over_snapshots() {
        let store = EntityStore::new();
        let mut product = Product::new("a");
        let records = vec![ResultRecord::new("r", "t", "2024-01-01", "d")];
        product.set_snapshot(StageId::Report, records.clone());
        let id = product.id;
        store.insert(product);

        // Fresh minimal fetch: same entity, statuses only.
        let mut fresh = Product::new("a");
        fresh.id = id;
        fresh.set_stage(StageId::Report, StageState::completed());
        store.reconcile(vec![fresh]);

        let after = store.get(id).unwrap();
        assert_eq!(after.stage(StageId::Report).status, StageStatus::Completed);
        assert_eq!(after.snapshot(StageId::Report), Some(&records));
    }

    #[test]
    fn test_reconcile_is_last_write_wins_on_membership() {
        let store = EntityStore::new();
        let kept = stored(&store, "kept");
        let _dropped = stored(&store, "dropped");

        let mut fresh = Product::new("kept");
        fresh.id = kept.id;
        store.reconcile(vec![fresh]);

        assert_eq!(store.len(), 1);
        assert!(store.get(kept.id).is_some());
    }
}
