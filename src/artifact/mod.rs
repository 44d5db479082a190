//! Image artifacts in their three wire representations

pub mod base64;
pub mod upload;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, Result};

/// Scheme prefix of ephemeral upload references
pub const EPHEMERAL_SCHEME: &str = "blob:";

/// An image value as it travels between client, proxy and backend.
///
/// Only [`ImageArtifact::Embedded`] is safe to hand to a stage that may outlive the
/// uploading client; ephemeral references die with the upload store and remote URLs
/// live only as long as the provider keeps them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageArtifact {
    /// Transient reference to bytes held by the uploading side (`blob:<id>`)
    Ephemeral(String),
    /// Provider-hosted URL
    Remote(String),
    /// Self-contained base64 payload
    Embedded { mime_type: String, payload: String },
}

impl ImageArtifact {
    /// Classify a wire string
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();

        if value.starts_with("data:") {
            let (mime, payload) = base64::parse_data_url(value).ok_or_else(|| {
                AppError::InvalidRequest("Malformed data URL image".to_string())
            })?;
            return Ok(Self::Embedded {
                mime_type: mime.unwrap_or(upload::GENERIC_IMAGE_MIME).to_string(),
                payload: payload.to_string(),
            });
        }

        if value.starts_with(EPHEMERAL_SCHEME) {
            return Ok(Self::Ephemeral(value.to_string()));
        }

        if value.starts_with("https://") || value.starts_with("http://") {
            return Ok(Self::Remote(value.to_string()));
        }

        Err(AppError::InvalidRequest(format!(
            "Unrecognized image reference: {}",
            truncate(value, 48)
        )))
    }

    /// Build an embedded artifact from raw bytes
    pub fn embed(data: &[u8], mime_type: &str) -> Self {
        Self::Embedded {
            mime_type: mime_type.to_string(),
            payload: base64::encode(data),
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded { .. })
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Decoded bytes of an embedded artifact
    pub fn bytes(&self) -> Option<Result<Vec<u8>>> {
        match self {
            Self::Embedded { payload, .. } => Some(base64::decode(payload)),
            _ => None,
        }
    }

    /// Serialized form used in request and response bodies
    pub fn to_wire(&self) -> String {
        match self {
            Self::Ephemeral(reference) => reference.clone(),
            Self::Remote(url) => url.clone(),
            Self::Embedded { mime_type, payload } => {
                format!("data:{};base64,{}", mime_type, payload)
            }
        }
    }
}

impl fmt::Display for ImageArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never dump a whole payload into logs
        match self {
            Self::Ephemeral(reference) => write!(f, "ephemeral({})", reference),
            Self::Remote(url) => write!(f, "remote({})", url),
            Self::Embedded { mime_type, payload } => {
                write!(f, "embedded({}, {} chars)", mime_type, payload.len())
            }
        }
    }
}

impl TryFrom<String> for ImageArtifact {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ImageArtifact> for String {
    fn from(artifact: ImageArtifact) -> Self {
        artifact.to_wire()
    }
}

fn truncate(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
