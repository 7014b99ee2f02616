//! Source image acquisition.

use crate::config::RenderflowConfig;
use crate::core::ImagePayload;
use crate::errors::RenderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a source image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "location", rename_all = "snake_case")]
pub enum SourceRef {
    /// A local file.
    File(PathBuf),
    /// A remote URL.
    Url(String),
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Produces a size-bounded encoded still image for a source.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Loads the image.
    async fn load(&self, source: &SourceRef) -> Result<ImagePayload, RenderError>;
}

/// Infers an image MIME type from a file extension.
#[must_use]
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

/// Loads local files with tokio and, with feature `remote`, URLs with reqwest.
///
/// Images larger than the byte bound are rejected rather than resized.
#[derive(Debug, Clone)]
pub struct DefaultImageSource {
    max_bytes: usize,
    #[cfg(feature = "remote")]
    client: reqwest::Client,
}

impl DefaultImageSource {
    /// Creates a source with the given byte bound.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            #[cfg(feature = "remote")]
            client: reqwest::Client::new(),
        }
    }

    /// Replaces the HTTP client used for URL sources.
    #[cfg(feature = "remote")]
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Creates a source from configuration.
    #[must_use]
    pub fn from_config(config: &RenderflowConfig) -> Self {
        Self::new(config.max_image_bytes)
    }

    fn check_bound(&self, source: &SourceRef, len: usize) -> Result<(), RenderError> {
        if len > self.max_bytes {
            return Err(RenderError::ImageLoad {
                source_ref: source.to_string(),
                reason: format!("{len} bytes exceeds the {} byte limit", self.max_bytes),
            });
        }
        Ok(())
    }

    async fn load_file(&self, source: &SourceRef, path: &Path) -> Result<ImagePayload, RenderError> {
        let mime = mime_from_path(path).ok_or_else(|| RenderError::ImageLoad {
            source_ref: source.to_string(),
            reason: "unsupported image extension".to_string(),
        })?;

        let metadata = tokio::fs::metadata(path).await?;
        self.check_bound(source, usize::try_from(metadata.len()).unwrap_or(usize::MAX))?;

        let data = tokio::fs::read(path).await?;
        self.check_bound(source, data.len())?;
        Ok(ImagePayload::new(mime, data))
    }

    #[cfg(feature = "remote")]
    async fn load_url(&self, source: &SourceRef, url: &str) -> Result<ImagePayload, RenderError> {
        let load_error = |reason: String| RenderError::ImageLoad {
            source_ref: source.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| load_error(e.to_string()))?;

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .ok_or_else(|| load_error("response is not an image".to_string()))?;

        if let Some(len) = response.content_length() {
            self.check_bound(source, usize::try_from(len).unwrap_or(usize::MAX))?;
        }

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| load_error(e.to_string()))? {
            self.check_bound(source, data.len() + chunk.len())?;
            data.extend_from_slice(&chunk);
        }
        Ok(ImagePayload::new(mime, data))
    }

    #[cfg(not(feature = "remote"))]
    async fn load_url(&self, source: &SourceRef, _url: &str) -> Result<ImagePayload, RenderError> {
        Err(RenderError::ImageLoad {
            source_ref: source.to_string(),
            reason: "URL sources require the `remote` feature".to_string(),
        })
    }
}

impl Default for DefaultImageSource {
    fn default() -> Self {
        Self::from_config(&RenderflowConfig::default())
    }
}

#[async_trait]
impl ImageSource for DefaultImageSource {
    async fn load(&self, source: &SourceRef) -> Result<ImagePayload, RenderError> {
        let image = match source {
            SourceRef::File(path) => self.load_file(source, path).await?,
            SourceRef::Url(url) => self.load_url(source, url).await?,
        };
        tracing::debug!(source = %source, bytes = image.len(), mime = %image.mime_type, "Loaded source image");
        Ok(image)
    }
}
