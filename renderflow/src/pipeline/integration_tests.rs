//! End-to-end tests for render runs against a mock generator.

use crate::core::{
    CameraAngle, ProductItem, RenderParameters, RenderStatus, StagingParameters, ViewType,
};
use crate::errors::RenderError;
use crate::events::CollectingEventSink;
use crate::pipeline::{RenderOrchestrator, RetryConfig, RunMode};
use crate::remote::{CredentialProvider, GenerationError, StaticCredentialProvider};
use crate::store::{InMemoryWorkItemStore, ItemFilter, WorkItemStore};
use crate::testing::{
    confirmed_product, product_photo, rendered_image, staged_product, store_with, tiny_png,
    MockImageGenerator,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    generator: Arc<MockImageGenerator>,
    credentials: Arc<StaticCredentialProvider>,
    events: Arc<CollectingEventSink>,
    orchestrator: RenderOrchestrator,
}

fn harness(store: Arc<InMemoryWorkItemStore>, generator: MockImageGenerator) -> Harness {
    let generator = Arc::new(generator);
    let credentials = Arc::new(StaticCredentialProvider::new("test-key"));
    let events = Arc::new(CollectingEventSink::new());
    let orchestrator = RenderOrchestrator::new(generator.clone(), credentials.clone(), store)
        .with_event_sink(events.clone());
    Harness {
        generator,
        credentials,
        events,
        orchestrator,
    }
}

fn staging(angles: impl IntoIterator<Item = CameraAngle>) -> StagingParameters {
    StagingParameters::default().with_angles(angles)
}

// Independent mode

#[tokio::test]
async fn test_independent_renders_all_confirmed_products() {
    let (store, ids) = store_with(vec![confirmed_product("chair"), confirmed_product("lamp")]);
    let generator = MockImageGenerator::new();
    generator.set_fallback(Ok(Some(tiny_png())));
    let h = harness(store.clone(), generator);

    let report = h
        .orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap();

    assert_eq!(report.mode, RunMode::Independent);
    assert_eq!(report.completed, ids);
    for id in &ids {
        let item = store.get(*id).unwrap();
        assert_eq!(item.render_status(), RenderStatus::Completed);
        assert_eq!(item.output(), Some(&tiny_png()));
    }
    assert!(store.scenes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_independent_is_sequential_in_list_order() {
    let (store, ids) = store_with(vec![
        confirmed_product("a"),
        ProductItem::new("skipped", product_photo("skipped"), ViewType::Front),
        confirmed_product("b"),
        confirmed_product("c"),
    ]);
    let h = harness(store, MockImageGenerator::with_latency(Duration::from_millis(100)));

    let report = h
        .orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap();

    assert_eq!(report.processed, vec![ids[0], ids[2], ids[3]]);
    assert_eq!(h.generator.max_in_flight(), 1);

    let leading: Vec<_> = h
        .generator
        .requests()
        .into_iter()
        .map(|r| r.references[0].clone())
        .collect();
    assert_eq!(leading, vec![product_photo("a"), product_photo("b"), product_photo("c")]);
}

#[tokio::test]
async fn test_independent_mood_board_follows_product() {
    let (store, _) = store_with(vec![confirmed_product("a")]);
    let h = harness(store, MockImageGenerator::new());
    let board = product_photo("board");

    h.orchestrator
        .run_independent(&RenderParameters::default(), Some(&board))
        .await
        .unwrap();

    let request = h.generator.last_request().unwrap();
    assert_eq!(request.references, vec![product_photo("a"), board]);
}

#[tokio::test]
async fn test_independent_retries_errored_items() {
    let (store, ids) = store_with(vec![confirmed_product("a")]);
    let h = harness(store.clone(), MockImageGenerator::new());
    h.generator.push_error(GenerationError::other("backend unavailable"));

    let failure = h
        .orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap_err();
    assert_eq!(failure.item_id, Some(ids[0]));
    assert_eq!(store.get(ids[0]).unwrap().render_status(), RenderStatus::Error);

    let report = h
        .orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap();
    assert_eq!(report.completed, ids);
}

// Staging mode

#[tokio::test]
async fn test_staging_without_selection_aborts() {
    let (store, _) = store_with(vec![
        confirmed_product("a"),
        ProductItem::new("b", product_photo("b"), ViewType::Front).selected(),
    ]);
    let h = harness(store.clone(), MockImageGenerator::new());

    let failure = h
        .orchestrator
        .run_staging(&staging([CameraAngle::Wide]), None)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RenderError::NoSelection));
    assert!(failure.user_message().contains("Select at least one confirmed product"));
    assert!(store.scenes().is_empty());
    assert_eq!(h.generator.call_count(), 0);
    assert_eq!(h.events.event_types(), vec!["run.halted"]);
}

#[tokio::test]
async fn test_staging_orders_wide_first_and_threads_master() {
    let (store, ids) = store_with(vec![staged_product("sofa")]);
    let h = harness(store.clone(), MockImageGenerator::new());

    let report = h
        .orchestrator
        .run_staging(
            &staging([CameraAngle::TopDown, CameraAngle::Wide, CameraAngle::CloseUp]),
            None,
        )
        .await
        .unwrap();

    let scenes = store.scenes();
    let angles: Vec<_> = scenes.iter().map(|s| s.angle.clone()).collect();
    assert_eq!(
        angles,
        vec![CameraAngle::Wide, CameraAngle::TopDown, CameraAngle::CloseUp]
    );
    assert_eq!(
        scenes.iter().map(|s| s.is_master).collect::<Vec<_>>(),
        vec![true, false, false]
    );
    assert!(scenes.iter().all(|s| s.product_ids() == ids.as_slice()));
    assert_eq!(report.master_id, Some(scenes[0].id));
    assert_eq!(report.created_scenes, scenes.iter().map(|s| s.id).collect::<Vec<_>>());

    let master_output = rendered_image(0);
    assert_eq!(scenes[0].output.as_ref(), Some(&master_output));

    let requests = h.generator.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].references, vec![product_photo("sofa")]);
    for dependent in &requests[1..] {
        assert_eq!(dependent.first_reference(), Some(&master_output));
        assert_eq!(dependent.references[1..].to_vec(), vec![product_photo("sofa")]);
    }
    assert!(requests[1].instruction.contains("bird's-eye"));
    assert!(requests[2].instruction.contains("close-up"));
}

#[tokio::test]
async fn test_staging_only_uses_selected_confirmed_products() {
    let (store, ids) = store_with(vec![
        staged_product("a"),
        confirmed_product("b"),
        ProductItem::new("c", product_photo("c"), ViewType::Side).selected(),
        staged_product("d"),
    ]);
    let h = harness(store.clone(), MockImageGenerator::new());
    let board = product_photo("board");

    h.orchestrator
        .run_staging(&staging([CameraAngle::Medium]), Some(&board))
        .await
        .unwrap();

    assert_eq!(store.scenes()[0].product_ids().to_vec(), vec![ids[0], ids[3]]);
    let request = h.generator.last_request().unwrap();
    assert_eq!(
        request.references,
        vec![board, product_photo("a"), product_photo("d")]
    );
}

#[tokio::test]
async fn test_staging_creates_scenes_before_first_call() {
    let (store, _) = store_with(vec![staged_product("a")]);
    let h = harness(store.clone(), MockImageGenerator::new());
    h.generator.push_error(GenerationError::unauthorized("API key not valid"));

    let failure = h
        .orchestrator
        .run_staging(&staging([CameraAngle::Wide, CameraAngle::Medium]), None)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RenderError::Unauthorized(_)));
    assert_eq!(h.generator.call_count(), 1);

    let statuses: Vec<_> = store.scenes().iter().map(|s| s.render_status).collect();
    assert_eq!(statuses, vec![RenderStatus::Error, RenderStatus::Pending]);
}

#[tokio::test]
async fn test_master_is_not_carried_across_runs() {
    let (store, _) = store_with(vec![staged_product("a")]);
    let h = harness(store.clone(), MockImageGenerator::new());
    let params = staging([CameraAngle::Wide, CameraAngle::Medium]);

    h.orchestrator.run_staging(&params, None).await.unwrap();
    let second = h.orchestrator.run_staging(&params, None).await.unwrap();

    let requests = h.generator.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[2].references, vec![product_photo("a")]);
    assert_eq!(requests[3].references[0], rendered_image(2));

    assert_eq!(store.scenes().len(), 4);
    let second_master = store.get(second.master_id.unwrap()).unwrap();
    assert_eq!(second_master.output(), Some(&rendered_image(2)));
}

#[tokio::test]
async fn test_staging_events_share_run_id() {
    let (store, _) = store_with(vec![staged_product("a")]);
    let h = harness(store, MockImageGenerator::new());

    let report = h
        .orchestrator
        .run_staging(&staging([CameraAngle::Wide, CameraAngle::DetailMacro]), None)
        .await
        .unwrap();

    assert_eq!(
        h.events.event_types(),
        vec![
            "scenes.created",
            "run.started",
            "item.processing",
            "item.completed",
            "item.processing",
            "item.completed",
            "run.completed",
        ]
    );
    assert_eq!(h.events.for_run(report.run_id).len(), h.events.len());
}

// Credentials and failures

#[tokio::test]
async fn test_missing_credential_in_both_modes() {
    let (store, _) = store_with(vec![staged_product("a")]);
    let generator = Arc::new(MockImageGenerator::new());
    let orchestrator = RenderOrchestrator::new(
        generator.clone(),
        Arc::new(StaticCredentialProvider::empty()),
        store.clone(),
    );

    let independent = orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap_err();
    let staged = orchestrator
        .run_staging(&staging([CameraAngle::Wide]), None)
        .await
        .unwrap_err();

    for failure in [independent, staged] {
        assert!(matches!(failure.error, RenderError::MissingCredential(_)));
        assert!(failure.error.requires_credential_action());
    }
    assert_eq!(generator.call_count(), 0);
    assert!(store.scenes().is_empty());
}

#[tokio::test]
async fn test_edit_without_credential_makes_no_call() {
    let (store, ids) = store_with(vec![confirmed_product("a")]);
    let h = harness(store.clone(), MockImageGenerator::new());
    h.orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap();
    h.credentials.invalidate();

    let err = h.orchestrator.edit_item(ids[0], "brighter").await.unwrap_err();

    assert!(matches!(err, RenderError::MissingCredential(_)));
    assert_eq!(h.generator.call_count(), 1);
    let item = store.get(ids[0]).unwrap();
    assert_eq!(item.render_status(), RenderStatus::Completed);
    assert_eq!(item.output(), Some(&rendered_image(0)));
}

#[tokio::test]
async fn test_entity_not_found_invalidates_credential() {
    let (store, ids) = store_with(vec![confirmed_product("a")]);
    let h = harness(store.clone(), MockImageGenerator::new());
    h.generator
        .push_error(GenerationError::entity_not_found("Requested entity was not found."));

    let failure = h
        .orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RenderError::EntityNotFound(_)));
    assert!(!h.credentials.has_selection());
    assert!(h.credentials.resolve().is_err());
    assert_eq!(store.get(ids[0]).unwrap().render_status(), RenderStatus::Error);

    let again = h
        .orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(again.error, RenderError::MissingCredential(_)));
    assert_eq!(h.generator.call_count(), 1);
}

#[tokio::test]
async fn test_empty_response_marks_error_and_halts() {
    let (store, ids) = store_with(vec![confirmed_product("a"), confirmed_product("b")]);
    let h = harness(store.clone(), MockImageGenerator::new());
    h.generator.push_empty();

    let failure = h
        .orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RenderError::EmptyResponse));
    assert_eq!(failure.item_id, Some(ids[0]));
    assert_eq!(store.get(ids[0]).unwrap().render_status(), RenderStatus::Error);
    assert_eq!(store.get(ids[1]).unwrap().render_status(), RenderStatus::Pending);
    assert_eq!(h.generator.call_count(), 1);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let (store, _) = store_with(vec![confirmed_product("a")]);
    let h = harness(store, MockImageGenerator::new());
    h.generator.push_error(GenerationError::unauthorized("denied").with_status(403));

    let failure = h
        .orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RenderError::Unauthorized(_)));
    assert_eq!(h.generator.call_count(), 1);
    assert!(h.events.events_of_type("retry.").is_empty());
}

// Retry

#[tokio::test(start_paused = true)]
async fn test_rate_limit_recovers_within_budget() {
    let (store, ids) = store_with(vec![confirmed_product("a")]);
    let h = harness(store.clone(), MockImageGenerator::new());
    h.generator
        .push_errors(&GenerationError::rate_limited("RESOURCE_EXHAUSTED"), 2);

    let start = tokio::time::Instant::now();
    let report = h
        .orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap();

    // 2000ms + 4000ms with the default exponential backoff.
    assert_eq!(start.elapsed(), Duration::from_millis(6000));
    assert_eq!(report.completed, ids);
    assert_eq!(store.get(ids[0]).unwrap().render_status(), RenderStatus::Completed);
    assert_eq!(h.generator.call_count(), 3);
    assert_eq!(h.events.events_of_type("retry.scheduled").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_quota_exhausted_keeps_earlier_results() {
    let (store, ids) = store_with(vec![confirmed_product("a"), confirmed_product("b")]);
    let generator = MockImageGenerator::new();
    generator.push_image(tiny_png());
    generator.set_fallback(Err(GenerationError::rate_limited("429 Too Many Requests")));
    let h = harness(store.clone(), generator);
    let orchestrator = h
        .orchestrator
        .with_retry_config(RetryConfig::default().with_max_retries(2).with_initial_delay_ms(100));

    let failure = orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, RenderError::QuotaExhausted(_)));
    assert!(failure.user_message().contains("rate limiting"));
    assert_eq!(failure.report.completed, vec![ids[0]]);
    assert_eq!(h.generator.call_count(), 1 + 3);

    let first = store.get(ids[0]).unwrap();
    assert_eq!(first.render_status(), RenderStatus::Completed);
    assert_eq!(first.output(), Some(&tiny_png()));
    assert_eq!(store.get(ids[1]).unwrap().render_status(), RenderStatus::Error);
    assert_eq!(h.events.events_of_type("retry.scheduled").len(), 2);
}

// Edits

#[tokio::test]
async fn test_edit_replaces_output() {
    let (store, ids) = store_with(vec![confirmed_product("a")]);
    let h = harness(store.clone(), MockImageGenerator::new());
    h.orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap();

    let edited = h.orchestrator.edit_item(ids[0], "make the walls sage green").await.unwrap();

    assert_eq!(edited.render_status(), RenderStatus::Completed);
    assert_eq!(edited.output(), Some(&rendered_image(1)));
    let request = h.generator.last_request().unwrap();
    assert_eq!(request.references, vec![rendered_image(0)]);
    assert!(request.instruction.contains("make the walls sage green"));
}

#[tokio::test]
async fn test_edit_failure_restores_prior_state() {
    let (store, ids) = store_with(vec![staged_product("a")]);
    let h = harness(store.clone(), MockImageGenerator::new());
    let report = h
        .orchestrator
        .run_staging(&staging([CameraAngle::Wide]), None)
        .await
        .unwrap();
    let scene_id = report.master_id.unwrap();
    h.generator.push_error(GenerationError::other("safety filter"));

    let err = h.orchestrator.edit_item(scene_id, "add a rug").await.unwrap_err();

    assert!(matches!(err, RenderError::Remote(_)));
    assert!(err.user_message().contains("safety filter"));
    let scene = store.get(scene_id).unwrap();
    assert_eq!(scene.render_status(), RenderStatus::Completed);
    assert_eq!(scene.output(), Some(&rendered_image(0)));
    assert_eq!(store.get(ids[0]).unwrap().render_status(), RenderStatus::Pending);
    assert!(store
        .list_items(&ItemFilter::all().excluding_status(RenderStatus::Completed))
        .iter()
        .all(|item| item.id() == ids[0]));
}

// Abandoned runs

#[tokio::test(start_paused = true)]
async fn test_dropped_independent_run_can_be_restarted() {
    let (store, ids) = store_with(vec![confirmed_product("a"), confirmed_product("b")]);
    let h = harness(
        store.clone(),
        MockImageGenerator::with_latency(Duration::from_secs(10)),
    );
    let params = RenderParameters::default();

    let dropped = tokio::time::timeout(
        Duration::from_millis(5),
        h.orchestrator.run_independent(&params, None),
    )
    .await;
    assert!(dropped.is_err());
    assert_eq!(store.get(ids[0]).unwrap().render_status(), RenderStatus::Processing);

    let report = h.orchestrator.run_independent(&params, None).await.unwrap();

    assert_eq!(report.completed, ids);
    assert!(ids
        .iter()
        .all(|id| store.get(*id).unwrap().render_status() == RenderStatus::Completed));
    let abandoned = h.events.events_of_type("item.abandoned");
    assert_eq!(abandoned.len(), 1);
    assert_eq!(abandoned[0].item_id(), Some(ids[0]));
    assert_eq!(abandoned[0].run_id(), Some(report.run_id));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_staging_run_restarts_with_new_master() {
    let (store, _) = store_with(vec![staged_product("sofa")]);
    let h = harness(
        store.clone(),
        MockImageGenerator::with_latency(Duration::from_secs(10)),
    );
    let params = staging([CameraAngle::Wide, CameraAngle::Medium]);

    let dropped = tokio::time::timeout(
        Duration::from_millis(5),
        h.orchestrator.run_staging(&params, None),
    )
    .await;
    assert!(dropped.is_err());
    let stale_master = store.scenes()[0].id;

    let report = h.orchestrator.run_staging(&params, None).await.unwrap();

    let master_id = report.master_id.unwrap();
    assert_ne!(master_id, stale_master);
    assert_eq!(store.get(stale_master).unwrap().render_status(), RenderStatus::Error);
    assert_eq!(store.scenes().len(), 4);

    let master_output = store.get(master_id).unwrap().output().cloned().unwrap();
    let dependent = h.generator.last_request().unwrap();
    assert_eq!(dependent.first_reference(), Some(&master_output));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_edit_can_be_retried() {
    let (store, ids) = store_with(vec![confirmed_product("a")]);
    let h = harness(
        store.clone(),
        MockImageGenerator::with_latency(Duration::from_secs(10)),
    );
    h.orchestrator
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap();

    let dropped = tokio::time::timeout(
        Duration::from_millis(5),
        h.orchestrator.edit_item(ids[0], "add plants"),
    )
    .await;
    assert!(dropped.is_err());
    assert_eq!(store.get(ids[0]).unwrap().render_status(), RenderStatus::Processing);

    let edited = h.orchestrator.edit_item(ids[0], "add plants").await.unwrap();

    assert_eq!(edited.render_status(), RenderStatus::Completed);
    assert_eq!(edited.output(), Some(&rendered_image(2)));
    assert_eq!(h.events.events_of_type("item.abandoned").len(), 1);
}
