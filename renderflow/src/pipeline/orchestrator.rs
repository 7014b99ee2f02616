//! The render orchestrator.
//!
//! Drives independent product renders, multi-angle staging runs and
//! single-item edits. Requests are built and submitted strictly one at a
//! time; the next request is composed only after the previous one resolved.

use super::report::{RunFailure, RunMode, RunReport};
use super::retry::{RetryConfig, RetryPolicy};
use crate::config::RenderflowConfig;
use crate::core::{
    GenerationRequest, ImagePayload, InputStatus, ItemId, OutputHints, ProductItem,
    RenderParameters, RenderStatus, SceneItem, StagingParameters, WorkItem,
};
use crate::errors::RenderError;
use crate::events::{self, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::prompt::PromptComposer;
use crate::remote::{Credential, CredentialProvider, GenerationError, ImageGenerator};
use crate::store::{ItemFilter, WorkItemStore};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Runs render requests against an [`ImageGenerator`] and writes results
/// back into a [`WorkItemStore`].
pub struct RenderOrchestrator {
    generator: Arc<dyn ImageGenerator>,
    credentials: Arc<dyn CredentialProvider>,
    store: Arc<dyn WorkItemStore>,
    composer: PromptComposer,
    retry: RetryPolicy,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for RenderOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOrchestrator")
            .field("generator", &self.generator.name())
            .field("composer", &self.composer)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RenderOrchestrator {
    /// Creates an orchestrator with default retry and output settings.
    #[must_use]
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        credentials: Arc<dyn CredentialProvider>,
        store: Arc<dyn WorkItemStore>,
    ) -> Self {
        Self {
            generator,
            credentials,
            store,
            composer: PromptComposer::default(),
            retry: RetryPolicy::default(),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Creates an orchestrator using the retry and output settings of `config`.
    #[must_use]
    pub fn from_config(
        config: &RenderflowConfig,
        generator: Arc<dyn ImageGenerator>,
        credentials: Arc<dyn CredentialProvider>,
        store: Arc<dyn WorkItemStore>,
    ) -> Self {
        Self::new(generator, credentials, store)
            .with_retry_config(config.retry.clone())
            .with_output_hints(config.output.clone())
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = RetryPolicy::new(config).with_event_sink(self.events.clone());
        self
    }

    /// Sets the output hints attached to every request.
    #[must_use]
    pub fn with_output_hints(mut self, output: OutputHints) -> Self {
        self.composer = PromptComposer::new(output);
        self
    }

    /// Sets the event sink for run, item and retry events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.retry = self.retry.with_event_sink(sink.clone());
        self.events = sink;
        self
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn WorkItemStore> {
        &self.store
    }

    /// Returns the composer.
    #[must_use]
    pub fn composer(&self) -> &PromptComposer {
        &self.composer
    }

    /// Renders every confirmed product that is not yet completed, in store
    /// order, each in its own styled environment.
    ///
    /// Halts at the first failing item. Items completed earlier keep their
    /// output.
    pub async fn run_independent(
        &self,
        params: &RenderParameters,
        mood_board: Option<&ImagePayload>,
    ) -> Result<RunReport, RunFailure> {
        let timer = SpanTimer::start("run_independent");
        let mut report = RunReport::new(RunMode::Independent);

        let credential = match self.credentials.resolve() {
            Ok(credential) => credential,
            Err(e) => return Err(self.halt(e, None, report, timer).await),
        };
        if let Err(e) = self.recover_abandoned(report.run_id, None).await {
            return Err(self.halt(e, None, report, timer).await);
        }

        let items = self.store.list_items(
            &ItemFilter::products()
                .with_input_status(InputStatus::Confirmed)
                .excluding_status(RenderStatus::Completed),
        );
        self.start(&report, items.len()).await;

        for product in items.iter().filter_map(WorkItem::as_product) {
            let request = self.composer.product_render(
                &product.source,
                product.view_type,
                params,
                mood_board,
            );
            if let Err(e) = self
                .render_item(&mut report, product.id, request, &credential)
                .await
            {
                return Err(self.halt(e, Some(product.id), report, timer).await);
            }
        }

        Ok(self.finish(report, timer).await)
    }

    /// Stages the selected, confirmed products from several camera angles.
    ///
    /// The first angle in [`StagingParameters::sorted_angles`] order is the
    /// master shot. Its output is passed as the leading reference to every
    /// other angle of this run so all shots depict the same room. Scene items
    /// for all angles are appended before the first request.
    pub async fn run_staging(
        &self,
        params: &StagingParameters,
        mood_board: Option<&ImagePayload>,
    ) -> Result<RunReport, RunFailure> {
        let timer = SpanTimer::start("run_staging");
        let mut report = RunReport::new(RunMode::Staging);

        let credential = match self.credentials.resolve() {
            Ok(credential) => credential,
            Err(e) => return Err(self.halt(e, None, report, timer).await),
        };
        if let Err(e) = self.recover_abandoned(report.run_id, None).await {
            return Err(self.halt(e, None, report, timer).await);
        }

        let products: Vec<ProductItem> = self
            .store
            .list_items(
                &ItemFilter::products()
                    .with_input_status(InputStatus::Confirmed)
                    .with_selected(true),
            )
            .into_iter()
            .filter_map(|item| match item {
                WorkItem::Product(product) => Some(product),
                WorkItem::Scene(_) => None,
            })
            .collect();
        if products.is_empty() {
            return Err(self.halt(RenderError::NoSelection, None, report, timer).await);
        }

        let angles = params.sorted_angles();
        let Some((master_angle, dependent_angles)) = angles.split_first() else {
            let e = RenderError::InvalidInput("at least one camera angle is required".to_string());
            return Err(self.halt(e, None, report, timer).await);
        };

        let product_ids: Vec<ItemId> = products.iter().map(|p| p.id).collect();
        let sources: Vec<ImagePayload> = products.into_iter().map(|p| p.source).collect();

        let master = SceneItem::new(product_ids.clone(), master_angle.clone(), true);
        let dependents: Vec<SceneItem> = dependent_angles
            .iter()
            .map(|angle| SceneItem::new(product_ids.clone(), angle.clone(), false))
            .collect();

        report.master_id = Some(master.id);
        report.created_scenes = std::iter::once(master.id)
            .chain(dependents.iter().map(|s| s.id))
            .collect();

        let batch: Vec<WorkItem> = std::iter::once(&master)
            .chain(&dependents)
            .cloned()
            .map(WorkItem::from)
            .collect();
        if let Err(e) = self.store.append_items(batch) {
            return Err(self.halt(e, None, report, timer).await);
        }
        self.events
            .emit(
                events::SCENES_CREATED,
                Some(json!({
                    "run_id": report.run_id,
                    "master_id": master.id,
                    "scene_ids": report.created_scenes,
                    "product_ids": product_ids,
                })),
            )
            .await;
        self.start(&report, report.created_scenes.len()).await;

        let request = self
            .composer
            .scene(&sources, params, &master.angle, mood_board, None);
        let master_shot = match self
            .render_item(&mut report, master.id, request, &credential)
            .await
        {
            Ok(image) => image,
            Err(e) => return Err(self.halt(e, Some(master.id), report, timer).await),
        };
        debug!(
            run_id = %report.run_id,
            master_id = %master.id,
            digest = %master_shot.digest(),
            "Master shot established"
        );

        for scene in &dependents {
            let request = self.composer.scene(
                &sources,
                params,
                &scene.angle,
                mood_board,
                Some(&master_shot),
            );
            if let Err(e) = self
                .render_item(&mut report, scene.id, request, &credential)
                .await
            {
                return Err(self.halt(e, Some(scene.id), report, timer).await);
            }
        }

        Ok(self.finish(report, timer).await)
    }

    /// Applies a free-form edit to an item's rendered output.
    ///
    /// On success the item holds the edited output and is `completed`. On
    /// failure the item's prior status and output are restored and the error
    /// is returned.
    pub async fn edit_item(&self, id: ItemId, instruction: &str) -> Result<WorkItem, RenderError> {
        if instruction.trim().is_empty() {
            return Err(RenderError::InvalidInput(
                "edit instruction must not be empty".to_string(),
            ));
        }

        let edit_id = Uuid::new_v4();
        if self
            .store
            .get(id)
            .is_some_and(|item| item.render_status() == RenderStatus::Processing)
        {
            self.recover_abandoned(edit_id, Some(id)).await?;
        }

        let item = self.store.get(id).ok_or(RenderError::ItemNotFound(id))?;
        let prior = item.render_status();
        if !prior.is_terminal() {
            return Err(RenderError::NotEditable {
                id,
                reason: format!("render status is {prior}"),
            });
        }
        let Some(image) = item.output() else {
            return Err(RenderError::NotEditable {
                id,
                reason: "item has no rendered output".to_string(),
            });
        };

        let credential = self.credentials.resolve()?;
        let request = self.composer.edit(image, instruction);

        info!(edit_id = %edit_id, item_id = %id, "Editing rendered item");
        self.store.update_status(id, RenderStatus::Processing, None)?;
        self.events
            .emit(
                events::ITEM_PROCESSING,
                Some(json!({ "run_id": edit_id, "item_id": id, "edit": true })),
            )
            .await;

        match self.generate(&format!("edit {id}"), &request, &credential).await {
            Ok(output) => {
                let digest = output.digest();
                self.store.update_status(id, RenderStatus::Completed, Some(output))?;
                self.events
                    .emit(
                        events::ITEM_COMPLETED,
                        Some(json!({
                            "run_id": edit_id,
                            "item_id": id,
                            "edit": true,
                            "digest": digest,
                        })),
                    )
                    .await;
                self.store.get(id).ok_or(RenderError::ItemNotFound(id))
            }
            Err(e) => {
                if let Err(restore) = self.store.update_status(id, prior, None) {
                    warn!(item_id = %id, error = %restore, "Failed to restore status after edit failure");
                }
                self.report_failure(edit_id, id, &e).await;
                Err(e)
            }
        }
    }

    /// Marks items a previous run left in `processing` as `error`.
    ///
    /// Only one run drives a store at a time, so at run start such items
    /// belong to a run that was dropped mid-call. `only` narrows the sweep
    /// to one item.
    async fn recover_abandoned(
        &self,
        run_id: Uuid,
        only: Option<ItemId>,
    ) -> Result<(), RenderError> {
        let filter = match only {
            Some(id) => ItemFilter::all().with_ids([id]),
            None => ItemFilter::all(),
        };
        let stuck: Vec<ItemId> = self
            .store
            .list_items(&filter)
            .iter()
            .filter(|item| item.render_status() == RenderStatus::Processing)
            .map(WorkItem::id)
            .collect();

        for id in stuck {
            self.store.update_status(id, RenderStatus::Error, None)?;
            warn!(run_id = %run_id, item_id = %id, "Recovered item abandoned in processing");
            self.events
                .emit(
                    events::ITEM_ABANDONED,
                    Some(json!({ "run_id": run_id, "item_id": id })),
                )
                .await;
        }
        Ok(())
    }

    async fn render_item(
        &self,
        report: &mut RunReport,
        id: ItemId,
        request: GenerationRequest,
        credential: &Credential,
    ) -> Result<ImagePayload, RenderError> {
        let run_id = report.run_id;
        self.store.update_status(id, RenderStatus::Processing, None)?;
        report.processed.push(id);

        debug!(
            run_id = %run_id,
            item_id = %id,
            references = request.references.len(),
            "Submitting render request"
        );
        self.events
            .emit(
                events::ITEM_PROCESSING,
                Some(json!({
                    "run_id": run_id,
                    "item_id": id,
                    "index": report.processed.len() - 1,
                    "references": request.references.len(),
                })),
            )
            .await;

        match self.generate(&format!("item {id}"), &request, credential).await {
            Ok(output) => {
                let digest = output.digest();
                self.store
                    .update_status(id, RenderStatus::Completed, Some(output.clone()))?;
                report.completed.push(id);
                info!(run_id = %run_id, item_id = %id, digest = %digest, "Item rendered");
                self.events
                    .emit(
                        events::ITEM_COMPLETED,
                        Some(json!({ "run_id": run_id, "item_id": id, "digest": digest })),
                    )
                    .await;
                Ok(output)
            }
            Err(e) => {
                if let Err(mark) = self.store.update_status(id, RenderStatus::Error, None) {
                    warn!(item_id = %id, error = %mark, "Failed to mark item as errored");
                }
                self.report_failure(run_id, id, &e).await;
                Err(e)
            }
        }
    }

    /// One remote call under the retry policy, with the outcome mapped into
    /// the error taxonomy.
    async fn generate(
        &self,
        label: &str,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<ImagePayload, RenderError> {
        let outcome: Result<Option<ImagePayload>, GenerationError> = self
            .retry
            .execute(label, || self.generator.generate(request, credential))
            .await;

        match outcome {
            Ok(Some(image)) => Ok(image),
            Ok(None) => Err(RenderError::EmptyResponse),
            Err(e) => Err(e.into()),
        }
    }

    async fn report_failure(&self, run_id: Uuid, id: ItemId, error: &RenderError) {
        if matches!(error, RenderError::EntityNotFound(_)) {
            self.credentials.invalidate();
        }
        warn!(run_id = %run_id, item_id = %id, kind = %error.kind(), error = %error, "Item failed");
        self.events
            .emit(
                events::ITEM_FAILED,
                Some(json!({
                    "run_id": run_id,
                    "item_id": id,
                    "kind": error.kind(),
                    "error": error.to_string(),
                })),
            )
            .await;
    }

    async fn start(&self, report: &RunReport, items: usize) {
        info!(run_id = %report.run_id, mode = %report.mode, items, "Render run started");
        self.events
            .emit(
                events::RUN_STARTED,
                Some(json!({
                    "run_id": report.run_id,
                    "mode": report.mode,
                    "items": items,
                    "generator": self.generator.name(),
                })),
            )
            .await;
    }

    async fn finish(&self, mut report: RunReport, timer: SpanTimer) -> RunReport {
        report.duration_ms = timer.finish();
        info!(
            run_id = %report.run_id,
            mode = %report.mode,
            completed = report.completed.len(),
            duration_ms = report.duration_ms,
            "Render run completed"
        );
        self.events
            .emit(
                events::RUN_COMPLETED,
                Some(json!({
                    "run_id": report.run_id,
                    "mode": report.mode,
                    "processed": report.processed.len(),
                    "completed": report.completed.len(),
                    "duration_ms": report.duration_ms,
                })),
            )
            .await;
        report
    }

    async fn halt(
        &self,
        error: RenderError,
        item_id: Option<ItemId>,
        mut report: RunReport,
        timer: SpanTimer,
    ) -> RunFailure {
        report.duration_ms = timer.finish();
        error!(
            run_id = %report.run_id,
            mode = %report.mode,
            item_id = ?item_id,
            kind = %error.kind(),
            error = %error,
            "Render run halted"
        );
        self.events
            .emit(
                events::RUN_HALTED,
                Some(json!({
                    "run_id": report.run_id,
                    "mode": report.mode,
                    "item_id": item_id,
                    "kind": error.kind(),
                    "message": error.user_message(),
                    "completed": report.completed.len(),
                })),
            )
            .await;
        RunFailure {
            error,
            item_id,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CameraAngle, ViewType};
    use crate::remote::StaticCredentialProvider;
    use crate::store::InMemoryWorkItemStore;
    use crate::testing::{tiny_png, MockImageGenerator};

    fn orchestrator(
        generator: Arc<MockImageGenerator>,
        store: Arc<InMemoryWorkItemStore>,
    ) -> RenderOrchestrator {
        RenderOrchestrator::new(
            generator,
            Arc::new(StaticCredentialProvider::new("test-key")),
            store,
        )
    }

    #[tokio::test]
    async fn test_independent_skips_unconfirmed_and_completed() {
        let store = Arc::new(InMemoryWorkItemStore::new());
        let imported = store.add_product(ProductItem::new("a", tiny_png(), ViewType::Front));
        let confirmed =
            store.add_product(ProductItem::new("b", tiny_png(), ViewType::Side).confirmed());
        let generator = Arc::new(MockImageGenerator::new());

        let report = orchestrator(generator.clone(), store.clone())
            .run_independent(&RenderParameters::default(), None)
            .await
            .unwrap();

        assert_eq!(report.processed, vec![confirmed]);
        assert_eq!(generator.call_count(), 1);
        assert_eq!(
            store.get(imported).unwrap().render_status(),
            RenderStatus::Pending
        );

        let again = orchestrator(generator.clone(), store)
            .run_independent(&RenderParameters::default(), None)
            .await
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_calls() {
        let store = Arc::new(InMemoryWorkItemStore::new());
        store.add_product(ProductItem::new("a", tiny_png(), ViewType::Front).confirmed());
        let generator = Arc::new(MockImageGenerator::new());

        let failure = RenderOrchestrator::new(
            generator.clone(),
            Arc::new(StaticCredentialProvider::empty()),
            store,
        )
        .run_independent(&RenderParameters::default(), None)
        .await
        .unwrap_err();

        assert!(matches!(failure.error, RenderError::MissingCredential(_)));
        assert!(failure.item_id.is_none());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_staging_rejects_empty_angles() {
        let store = Arc::new(InMemoryWorkItemStore::new());
        store.add_product(
            ProductItem::new("a", tiny_png(), ViewType::Front)
                .confirmed()
                .selected(),
        );
        let generator = Arc::new(MockImageGenerator::new());
        let params = StagingParameters::default().with_angles(Vec::<CameraAngle>::new());

        let failure = orchestrator(generator.clone(), store.clone())
            .run_staging(&params, None)
            .await
            .unwrap_err();

        assert!(matches!(failure.error, RenderError::InvalidInput(_)));
        assert!(store.scenes().is_empty());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_requires_output() {
        let store = Arc::new(InMemoryWorkItemStore::new());
        let id = store.add_product(ProductItem::new("a", tiny_png(), ViewType::Front).confirmed());
        let generator = Arc::new(MockImageGenerator::new());
        let orch = orchestrator(generator.clone(), store);

        let err = orch.edit_item(id, "warmer light").await.unwrap_err();
        assert!(matches!(err, RenderError::NotEditable { .. }));

        let err = orch.edit_item(Uuid::new_v4(), "warmer light").await.unwrap_err();
        assert!(matches!(err, RenderError::ItemNotFound(_)));

        let err = orch.edit_item(id, "   ").await.unwrap_err();
        assert!(matches!(err, RenderError::InvalidInput(_)));
        assert_eq!(generator.call_count(), 0);
    }
}
