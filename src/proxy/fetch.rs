//! Fetching provider-hosted images so they can be embedded

use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use tracing::debug;

use crate::artifact::ImageArtifact;
use crate::config::TranscodingConfig;
use crate::error::{AppError, Result};

/// Downloads remote images and re-encodes them as embedded artifacts
pub struct RemoteFetcher {
    client: Client,
    default_mime_type: String,
    max_image_bytes: usize,
}

impl RemoteFetcher {
    pub fn new(config: &TranscodingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            default_mime_type: config.default_mime_type.clone(),
            max_image_bytes: config.max_image_bytes,
        })
    }

    /// Fetch `url` and return it as an embedded artifact.
    /// Every failure is reported as a transcoding error.
    pub async fn fetch(&self, url: &str) -> Result<ImageArtifact> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Transcoding(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transcoding(format!(
                "Fetching {} returned {}",
                url, status
            )));
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_image_bytes {
                return Err(self.too_large(url, length as usize));
            }
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| value.starts_with("image/"))
            .unwrap_or_else(|| self.default_mime_type.clone());

        // Chunked responses carry no length, so the limit is enforced while reading
        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AppError::Transcoding(format!("Failed to read {}: {}", url, e)))?
        {
            let size = data.len() + chunk.len();
            if size > self.max_image_bytes {
                return Err(self.too_large(url, size));
            }
            data.extend_from_slice(&chunk);
        }

        debug!(url = %url, mime = %mime_type, size = data.len(), "Fetched remote image");

        Ok(ImageArtifact::embed(&data, &mime_type))
    }

    fn too_large(&self, url: &str, size: usize) -> AppError {
        AppError::Transcoding(format!(
            "Image at {} is at least {} bytes, limit is {}",
            url, size, self.max_image_bytes
        ))
    }
}
