//! Gemini `generateContent` client.

use super::{Credential, FailureKind, GenerationError, ImageGenerator};
use crate::config::RenderflowConfig;
use crate::core::{GenerationRequest, ImagePayload};
use crate::errors::RenderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const ENTITY_NOT_FOUND_MARKER: &str = "Requested entity was not found";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn build_body(request: &GenerationRequest) -> GenerateContentBody {
    let mut parts: Vec<Part> = request
        .references
        .iter()
        .map(|image| Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: image.to_base64(),
            }),
        })
        .collect();
    parts.push(Part {
        text: Some(request.instruction.clone()),
        inline_data: None,
    });

    let hints = &request.output;
    let image_config = (hints.aspect_ratio.is_some() || hints.image_size.is_some()).then(|| {
        ImageConfig {
            aspect_ratio: hints.aspect_ratio.clone(),
            image_size: hints.image_size.clone(),
        }
    });

    GenerateContentBody {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["IMAGE"],
            image_config,
        },
    }
}

fn extract_image(response: GenerateContentResponse) -> Result<Option<ImagePayload>, GenerationError> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.inline_data));

    match inline {
        Some(data) => ImagePayload::from_base64(data.mime_type, &data.data)
            .map(Some)
            .map_err(|e| GenerationError::other(format!("invalid image payload: {e}"))),
        None => Ok(None),
    }
}

/// Maps an HTTP error response to a [`GenerationError`].
#[must_use]
pub fn classify_http_error(status: u16, body: &str) -> GenerationError {
    let (message, api_status) = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| (envelope.error.message, envelope.error.status))
        .unwrap_or_else(|_| (body.to_string(), String::new()));

    let kind = if status == 429 || api_status == "RESOURCE_EXHAUSTED" {
        FailureKind::RateLimited
    } else if message.contains(ENTITY_NOT_FOUND_MARKER) || status == 404 {
        FailureKind::EntityNotFound
    } else if matches!(status, 401 | 403)
        || api_status == "UNAUTHENTICATED"
        || api_status == "PERMISSION_DENIED"
        || message.contains("API key not valid")
    {
        FailureKind::Unauthorized
    } else {
        FailureKind::Other
    };

    let message = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        message
    };

    GenerationError::new(kind, message).with_status(status)
}

/// [`ImageGenerator`] backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiImageGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiImageGenerator {
    /// Creates a generator from configuration.
    pub fn new(config: &RenderflowConfig) -> Result<Self, RenderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RenderError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<Option<ImagePayload>, GenerationError> {
        let body = build_body(request);
        tracing::debug!(
            model = %self.model,
            references = request.references.len(),
            "Submitting generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::other(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::other(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_http_error(status.as_u16(), &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::other(format!("malformed response: {e}")))?;
        extract_image(parsed)
    }
}
