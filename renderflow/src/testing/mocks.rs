//! Mock collaborators for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::fixtures::rendered_image;
use crate::core::{GenerationRequest, ImagePayload};
use crate::remote::{Credential, GenerationError, ImageGenerator};

/// Result of one mocked remote call.
pub type MockOutcome = Result<Option<ImagePayload>, GenerationError>;

/// An [`ImageGenerator`] that plays back scripted outcomes and records every
/// request it receives.
///
/// Scripted outcomes are consumed in order. Once the script is empty, each
/// call returns [`rendered_image`] for its zero-based call index, so every
/// output is distinct.
#[derive(Debug, Default)]
pub struct MockImageGenerator {
    script: Mutex<VecDeque<MockOutcome>>,
    fallback: Mutex<Option<MockOutcome>>,
    requests: Mutex<Vec<GenerationRequest>>,
    credentials: Mutex<Vec<String>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockImageGenerator {
    /// Creates a generator that succeeds on every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator that sleeps `latency` inside every call.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Queues an outcome for the next unscripted call.
    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Queues a successful image.
    pub fn push_image(&self, image: ImagePayload) {
        self.push_outcome(Ok(Some(image)));
    }

    /// Queues a success without an image.
    pub fn push_empty(&self) {
        self.push_outcome(Ok(None));
    }

    /// Queues a failure.
    pub fn push_error(&self, error: GenerationError) {
        self.push_outcome(Err(error));
    }

    /// Queues the same failure `times` times.
    pub fn push_errors(&self, error: &GenerationError, times: usize) {
        let mut script = self.script.lock();
        for _ in 0..times {
            script.push_back(Err(error.clone()));
        }
    }

    /// Sets the outcome returned once the script is exhausted.
    pub fn set_fallback(&self, outcome: MockOutcome) {
        *self.fallback.lock() = Some(outcome);
    }

    /// Returns the number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns every request received, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// Returns the most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().last().cloned()
    }

    /// Returns the raw credential of every call, in call order.
    #[must_use]
    pub fn credentials_seen(&self) -> Vec<String> {
        self.credentials.lock().clone()
    }

    /// Returns the highest number of calls that were ever in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Resets recorded calls. Scripted outcomes are kept.
    pub fn reset(&self) {
        self.requests.lock().clear();
        self.credentials.lock().clear();
        self.max_in_flight.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<Option<ImagePayload>, GenerationError> {
        let index = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len() - 1
        };
        self.credentials.lock().push(credential.expose().to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => self
                .fallback
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(Some(rendered_image(index)))),
        }
    }
}
