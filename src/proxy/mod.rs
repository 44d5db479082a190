//! Transcoding proxy
//!
//! Sits between the client and the generation service. Outgoing requests have
//! their ephemeral image references replaced by embedded payloads; successful
//! responses have their provider-hosted image URLs replaced the same way, so the
//! caller never depends on the lifetime of either.

pub mod fetch;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::artifact::upload::UploadStore;
use crate::artifact::{ImageArtifact, EPHEMERAL_SCHEME};
use crate::backend::traits::{Envelope, GenerationBackend};
use crate::error::{AppError, Result};
use crate::stage::Stage;

pub use fetch::RemoteFetcher;

/// Request fields that may carry an image
pub const IMAGE_FIELDS: [&str; 3] = ["garment_image_url", "human_image_url", "reference_image"];

/// Stateless proxy in front of a generation backend
pub struct TranscodingProxy {
    backend: Arc<dyn GenerationBackend>,
    uploads: UploadStore,
    fetcher: RemoteFetcher,
    default_mime_type: String,
}

impl TranscodingProxy {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        uploads: UploadStore,
        fetcher: RemoteFetcher,
        default_mime_type: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            uploads,
            fetcher,
            default_mime_type: default_mime_type.into(),
        }
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Resolve inputs, forward to the backend, embed outputs.
    ///
    /// Identical calls are forwarded independently; nothing is cached.
    pub async fn submit(&self, stage: Stage, mut body: Value) -> Result<Envelope> {
        let resolved = self.embed_ephemeral_inputs(&mut body).await?;
        if resolved > 0 {
            debug!(stage = %stage, resolved, "Embedded ephemeral inputs");
        }

        let mut envelope = self.backend.submit(stage, body).await?;

        if !envelope.is_success() {
            info!(stage = %stage, code = envelope.code, message = %envelope.message, "Backend rejected request");
            return Ok(envelope);
        }

        let rewritten = self.embed_remote_outputs(&mut envelope).await?;
        info!(stage = %stage, rewritten, "Stage request completed");

        Ok(envelope)
    }

    /// Replace every ephemeral reference in the known image fields. Returns how many were replaced.
    pub async fn embed_ephemeral_inputs(&self, body: &mut Value) -> Result<usize> {
        let Some(fields) = body.as_object_mut() else {
            return Err(AppError::InvalidRequest(
                "Request body must be a JSON object".to_string(),
            ));
        };

        let mut resolved = 0;
        for field in IMAGE_FIELDS {
            let reference = match fields.get(field) {
                Some(Value::String(value)) if value.starts_with(EPHEMERAL_SCHEME) => value.clone(),
                _ => continue,
            };

            let artifact = self.resolve_ephemeral(&reference).await?;
            fields.insert(field.to_string(), Value::String(artifact.to_wire()));
            resolved += 1;
        }

        Ok(resolved)
    }

    /// Read an ephemeral upload and embed it
    pub async fn resolve_ephemeral(&self, reference: &str) -> Result<ImageArtifact> {
        let upload = self.uploads.read(reference).await.map_err(|e| {
            warn!(reference = %reference, error = %e, "Failed to resolve ephemeral image");
            AppError::Transcoding(format!("Failed to read uploaded image {}: {}", reference, e))
        })?;

        let mime_type = upload
            .mime_type
            .unwrap_or_else(|| self.default_mime_type.clone());

        Ok(ImageArtifact::embed(&upload.data, &mime_type))
    }

    /// Replace remote result images with embedded copies. Embedded entries are
    /// left byte-for-byte untouched. Returns how many images were fetched.
    pub async fn embed_remote_outputs(&self, envelope: &mut Envelope) -> Result<usize> {
        let Some(images) = envelope.data.as_mut().and_then(|d| d.images.as_mut()) else {
            return Ok(0);
        };

        let fetches = images.iter().enumerate().filter_map(|(idx, image)| {
            match ImageArtifact::parse(image) {
                Ok(ImageArtifact::Remote(url)) => Some(async move {
                    let artifact = self.fetcher.fetch(&url).await.map_err(|e| {
                        warn!(url = %url, error = %e, "Failed to embed remote image");
                        e
                    })?;
                    Ok::<_, AppError>((idx, artifact))
                }),
                Ok(_) => None,
                Err(_) => {
                    warn!(index = idx, "Leaving unrecognized result image untouched");
                    None
                }
            }
        });

        let fetched = try_join_all(fetches).await?;
        let count = fetched.len();

        for (idx, artifact) in fetched {
            images[idx] = artifact.to_wire();
        }

        Ok(count)
    }
}

#[async_trait]
impl GenerationBackend for TranscodingProxy {
    fn name(&self) -> &str {
        "transcoding-proxy"
    }

    async fn submit(&self, stage: Stage, body: Value) -> Result<Envelope> {
        TranscodingProxy::submit(self, stage, body).await
    }
}
