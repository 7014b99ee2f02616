//! Collaborators outside the pipeline core.
//!
//! This module provides:
//! - The remote image-generation capability and its failure classification
//! - Credential resolution
//! - Source image acquisition
//! - A Gemini REST client (feature `remote`)

mod credentials;
#[cfg(feature = "remote")]
mod gemini;
mod generator;
mod source;

pub use credentials::{
    Credential, CredentialProvider, EnvCredentialProvider, StaticCredentialProvider,
};
#[cfg(feature = "remote")]
pub use gemini::{classify_http_error, GeminiImageGenerator};
pub use generator::{FailureKind, GenerationError, ImageGenerator};
pub use source::{mime_from_path, DefaultImageSource, ImageSource, SourceRef};
