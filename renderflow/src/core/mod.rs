//! Core domain model types for renderflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Render and input status enums
//! - Image payloads
//! - Work items (product photos and staged scenes)
//! - Render and staging parameters
//! - Generation requests sent to the remote model

mod image;
mod item;
mod params;
mod request;
mod status;

pub use image::ImagePayload;
pub use item::{ItemId, ItemKind, ProductItem, SceneItem, ViewType, WorkItem};
pub use params::{CameraAngle, LayoutDensity, RenderParameters, StagingParameters};
pub use request::{GenerationRequest, OutputHints};
pub use status::{InputStatus, RenderStatus};
