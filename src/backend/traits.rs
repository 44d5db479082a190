//! Common traits and wire types for generation backends

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::stage::Stage;

/// Response envelope shared by every generation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// 0 on success, a domain error code otherwise
    pub code: i64,

    /// Human-readable status or error text
    #[serde(default)]
    pub message: String,

    /// Identifier assigned by the backend, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Stage payload, null on error
    #[serde(default)]
    pub data: Option<EnvelopeData>,
}

/// Payload of a generation response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeData {
    /// Result images as wire strings (remote URLs or data URLs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    /// Marketing copy produced by the campaign stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
}

impl Envelope {
    /// Successful envelope around a payload
    pub fn success(data: EnvelopeData) -> Self {
        Self {
            code: 0,
            message: "Success".to_string(),
            request_id: None,
            data: Some(data),
        }
    }

    /// Error envelope with no payload
    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: None,
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// First image of the payload, if any
    pub fn first_image(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.images.as_ref())
            .and_then(|images| images.first())
            .map(String::as_str)
    }

    /// Campaign text of the payload, if any
    pub fn campaign_content(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.campaign_content.as_deref())
    }
}

/// Anything that accepts a stage request body and answers with an envelope.
///
/// Implemented by the HTTP client for the generation service and by the
/// transcoding proxy, so the orchestrator can run against either.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name, used in logs
    fn name(&self) -> &str;

    /// Submit a request body for a stage.
    ///
    /// A nonzero domain code is returned as `Ok`; `Err` means the call itself
    /// failed (transport, decoding, or image transcoding).
    async fn submit(&self, stage: Stage, body: Value) -> Result<Envelope>;
}
