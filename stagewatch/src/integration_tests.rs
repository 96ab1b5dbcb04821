//! End-to-end scenarios wiring the store, refresher, controller,
//! scheduler, and orchestrator together against a scripted backend.

use std::sync::Arc;

use crate::backend::PipelineBackend;
use crate::cache::{keys, Cache};
use crate::config::{CacheTtls, OrchestratorConfig, PollConfig};
use crate::controller::OptimisticController;
use crate::core::{EntityId, NotificationKind, StageId, StageStatus};
use crate::errors::StagewatchError;
use crate::notify::CollectingSink;
use crate::orchestrator::RunOrchestrator;
use crate::refresh::{RefreshCoordinator, RefreshKind};
use crate::scheduler::PollScheduler;
use crate::store::EntityStore;
use crate::testing::{product_with_statuses, record, ScriptedBackend};

struct Harness {
    backend: Arc<ScriptedBackend>,
    store: Arc<EntityStore>,
    cache: Cache,
    sink: Arc<CollectingSink>,
    refresher: Arc<RefreshCoordinator>,
    controller: Arc<OptimisticController>,
    scheduler: PollScheduler,
    orchestrator: RunOrchestrator,
    entity: EntityId,
}

fn harness(statuses: [StageStatus; 5], debounce_ms: u64) -> Harness {
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(EntityStore::new());
    let cache = Cache::in_memory();
    let sink = Arc::new(CollectingSink::new());

    let product = product_with_statuses(statuses);
    let entity = product.id;
    store.insert(product.clone());
    backend.set_entities(vec![product]);

    let poll = PollConfig::default()
        .with_tick_interval_ms(5)
        .with_debounce_window_ms(debounce_ms);
    let refresher = Arc::new(RefreshCoordinator::new(
        backend.clone(),
        store.clone(),
        cache.clone(),
        sink.clone(),
        "tenant-a",
        poll,
        CacheTtls::default(),
    ));
    let controller = Arc::new(OptimisticController::new(
        store.clone(),
        backend.clone(),
        sink.clone(),
        refresher.clone(),
    ));
    let scheduler = PollScheduler::new(store.clone(), refresher.clone(), poll);
    let orchestrator = RunOrchestrator::new(
        store.clone(),
        backend.clone(),
        controller.clone(),
        refresher.clone(),
        sink.clone(),
        "tenant-a",
        OrchestratorConfig::default()
            .with_poll_interval_ms(2)
            .with_max_attempts(50),
    );

    Harness {
        backend,
        store,
        cache,
        sink,
        refresher,
        controller,
        scheduler,
        orchestrator,
        entity,
    }
}

#[tokio::test]
async fn test_continue_starts_only_the_first_incomplete_stage() {
    let hx = harness(
        [
            StageStatus::Completed,
            StageStatus::Completed,
            StageStatus::Pending,
            StageStatus::Pending,
            StageStatus::Pending,
        ],
        0,
    );

    let next = hx
        .store
        .get(hx.entity)
        .and_then(|p| p.first_incomplete())
        .unwrap();
    assert_eq!(next, StageId::Analyze);

    let backend = hx.backend.clone();
    let entity = hx.entity;
    let handle = hx
        .controller
        .execute(entity, next, move || async move {
            backend
                .execute_stage(entity, next, "tenant-a")
                .await
                .map_err(anyhow::Error::new)
        })
        .unwrap();
    handle.await.unwrap();

    // Exactly one stage was started, and the post-effect refresh brought
    // back its server-side completion.
    let started: Vec<StageId> = hx
        .backend
        .execute_calls()
        .iter()
        .map(|(_, stage)| *stage)
        .collect();
    assert_eq!(started, vec![StageId::Analyze]);
    assert_eq!(
        hx.store
            .stage_state(hx.entity, StageId::Analyze)
            .unwrap()
            .status,
        StageStatus::Completed
    );
    assert_eq!(
        hx.store
            .stage_state(hx.entity, StageId::Score)
            .unwrap()
            .status,
        StageStatus::Pending
    );
}

#[tokio::test]
async fn test_full_run_baselines_then_surfaces_new_results() {
    let hx = harness([StageStatus::Pending; 5], 0);
    let finding = record("finding-1", "d1");
    hx.backend.set_report_results(hx.entity, vec![finding.clone()]);

    let report = hx.orchestrator.run_all(hx.entity).await.unwrap();
    assert!(report.succeeded());

    // The refresh that observed Report completing stored the baseline
    // without announcing anything.
    assert!(hx.sink.events_of_kind(NotificationKind::New).is_empty());
    let cached: Option<Vec<crate::core::ResultRecord>> = hx
        .cache
        .get(&keys::report_results(hx.entity), "tenant-a", 30.0)
        .await;
    assert_eq!(cached.map(|r| r.len()), Some(1));

    // The next refresh sees one extra item and announces exactly it.
    hx.backend
        .set_report_results(hx.entity, vec![finding, record("finding-2", "d2")]);
    hx.refresher.refresh(RefreshKind::Manual).await.unwrap();

    let new_events = hx.sink.events_of_kind(NotificationKind::New);
    assert_eq!(new_events.len(), 1);
    assert_eq!(new_events[0].count_new, 1);
    assert_eq!(new_events[0].count_changed, 0);
    assert_eq!(new_events[0].entity_id, Some(hx.entity));
}

#[tokio::test]
async fn test_concurrent_starts_collapse_to_one() {
    let hx = harness([StageStatus::Pending; 5], 0);
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = hx
        .controller
        .execute(hx.entity, StageId::Ingest, move || async move {
            let _ = rx.await;
            Ok(())
        })
        .unwrap();

    // A second trigger while the first is in flight is rejected, and a
    // third on a now-running stage is rejected by the machine.
    let err = hx
        .controller
        .execute(hx.entity, StageId::Ingest, || async { Ok(()) })
        .unwrap_err();
    assert!(matches!(err, StagewatchError::StartPending { .. }));

    let _ = tx.send(());
    handle.await.unwrap();

    assert_eq!(hx.sink.events_of_kind(NotificationKind::Started).len(), 1);
}

#[tokio::test]
async fn test_post_effect_refresh_debounces_the_next_tick() {
    let hx = harness([StageStatus::Pending; 5], 60_000);
    // Server-side the work is already in flight, so reconciliation keeps
    // the scheduler interested.
    hx.backend.set_entities(vec![{
        let mut p = product_with_statuses([StageStatus::Running; 5]);
        p.id = hx.entity;
        p
    }]);

    // A successful start reconciles through a background refresh, setting
    // the debounce watermark.
    let handle = hx
        .controller
        .execute(hx.entity, StageId::Ingest, || async { Ok(()) })
        .unwrap();
    handle.await.unwrap();
    assert_eq!(hx.backend.list_calls(), 1);
    assert!(hx.store.any_running());

    // The scheduler tick right after lands inside the debounce window.
    assert!(!hx.scheduler.tick().await);
    assert_eq!(hx.backend.list_calls(), 1);
}

#[tokio::test]
async fn test_scheduler_stays_silent_once_work_drains() {
    let hx = harness([StageStatus::Running; 5], 0);

    // While running, ticks fetch.
    assert!(hx.scheduler.tick().await);

    // Server reports everything completed; the next tick reconciles that,
    // and the one after stays silent.
    hx.backend
        .set_entities(vec![{
            let mut p = product_with_statuses([StageStatus::Completed; 5]);
            p.id = hx.entity;
            p
        }]);
    assert!(hx.scheduler.tick().await);
    assert!(!hx.store.any_running());
    assert!(!hx.scheduler.tick().await);
    assert_eq!(hx.backend.list_calls(), 2);
}

#[tokio::test]
async fn test_stop_then_rerun_resumes_from_stopped_stage() {
    let hx = harness(
        [
            StageStatus::Completed,
            StageStatus::Running,
            StageStatus::Pending,
            StageStatus::Pending,
            StageStatus::Pending,
        ],
        0,
    );
    // Keep the backend view aligned so refreshes do not resurrect Running.
    hx.backend.set_entities(vec![{
        let mut p = product_with_statuses([
            StageStatus::Completed,
            StageStatus::Pending,
            StageStatus::Pending,
            StageStatus::Pending,
            StageStatus::Pending,
        ]);
        p.id = hx.entity;
        p
    }]);

    let state = hx.controller.stop(hx.entity, StageId::Enrich).await.unwrap();
    assert_eq!(state.status, StageStatus::Error);
    assert_eq!(state.error.as_deref(), Some("stopped by user"));

    // Re-running skips the completed prefix and restarts at the stopped stage.
    let report = hx.orchestrator.run_all(hx.entity).await.unwrap();
    assert!(report.succeeded());
    let started: Vec<StageId> = hx
        .backend
        .execute_calls()
        .iter()
        .map(|(_, stage)| *stage)
        .collect();
    assert_eq!(started.first(), Some(&StageId::Enrich));
}

#[tokio::test]
async fn test_cached_list_paints_a_fresh_session() {
    let hx = harness([StageStatus::Pending; 5], 0);
    hx.refresher.refresh(RefreshKind::Manual).await.unwrap();

    // A new session over the same cache paints before fetching.
    let store = Arc::new(EntityStore::new());
    let refresher = RefreshCoordinator::new(
        hx.backend.clone(),
        store.clone(),
        hx.cache.clone(),
        Arc::new(CollectingSink::new()),
        "tenant-a",
        PollConfig::default(),
        CacheTtls::default(),
    );

    assert!(refresher.prime_from_cache().await);
    assert!(store.get(hx.entity).is_some());

    // A different tenant sees nothing.
    let other_store = Arc::new(EntityStore::new());
    let other = RefreshCoordinator::new(
        hx.backend.clone(),
        other_store.clone(),
        hx.cache.clone(),
        Arc::new(CollectingSink::new()),
        "tenant-b",
        PollConfig::default(),
        CacheTtls::default(),
    );
    assert!(!other.prime_from_cache().await);
    assert!(other_store.is_empty());
}
