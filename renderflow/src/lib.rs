//! # Renderflow
//!
//! Staging pipeline that turns product photos into CGI-quality renders with a
//! generative image model.
//!
//! Renderflow drives two pipeline shapes:
//!
//! - **Independent rendering**: every confirmed product photo is rendered on
//!   its own, one request at a time, in list order.
//! - **Multi-angle staging**: a batch of scenes is created up front, the first
//!   angle establishes the room as the *master shot*, and every other angle is
//!   rendered by relocating the camera inside that same room.
//!
//! Each remote call runs behind a bounded exponential-backoff retry policy that
//! only reacts to rate-limit signals. Status and results are written back into
//! an injected [`store::WorkItemStore`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use renderflow::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryWorkItemStore::new());
//! let orchestrator = RenderOrchestrator::new(
//!     Arc::new(GeminiImageGenerator::new(&config)?),
//!     Arc::new(EnvCredentialProvider::from_config(&config)),
//!     store.clone(),
//! );
//!
//! let report = orchestrator
//!     .run_staging(&StagingParameters::default(), None)
//!     .await?;
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

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod prompt;
pub mod remote;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::RenderflowConfig;
    pub use crate::core::{
        CameraAngle, GenerationRequest, ImagePayload, InputStatus, ItemId, ItemKind,
        LayoutDensity, OutputHints, ProductItem, RenderParameters, RenderStatus, SceneItem,
        StagingParameters, ViewType, WorkItem,
    };
    pub use crate::errors::{ErrorKind, RenderError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        RenderOrchestrator, RetryConfig, RetryPolicy, RunFailure, RunMode, RunReport,
    };
    pub use crate::prompt::PromptComposer;
    #[cfg(feature = "remote")]
    pub use crate::remote::GeminiImageGenerator;
    pub use crate::remote::{
        Credential, CredentialProvider, DefaultImageSource, EnvCredentialProvider,
        FailureKind, GenerationError, ImageGenerator, ImageSource, SourceRef,
        StaticCredentialProvider,
    };
    pub use crate::store::{InMemoryWorkItemStore, ItemFilter, WorkItemStore};
}
