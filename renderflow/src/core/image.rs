//! Opaque image payloads exchanged with the remote model.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// An encoded still image with its MIME type.
///
/// The bytes are kept raw in memory and only base64-encoded at the wire
/// boundary (or when serialized).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// MIME type such as `image/png`.
    pub mime_type: String,
    /// Encoded image bytes.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl ImagePayload {
    /// Creates a payload from raw bytes.
    #[must_use]
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Decodes a payload from a base64 string.
    pub fn from_base64(
        mime_type: impl Into<String>,
        encoded: &str,
    ) -> Result<Self, base64::DecodeError> {
        Ok(Self::new(mime_type, STANDARD.decode(encoded)?))
    }

    /// Returns the bytes as standard base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// Returns a `data:` URL suitable for direct display.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Short content digest used to correlate payloads in logs and events.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.mime_type.as_bytes());
        hasher.update(&self.data);
        hex::encode(&hasher.finalize()[..8])
    }

    /// Returns the payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .field("digest", &self.digest())
            .finish()
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
