//! HTTP client for the generation service

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::traits::{Envelope, GenerationBackend};
use crate::config::BackendConfig;
use crate::error::{AppError, Result};
use crate::stage::Stage;

/// Generation service reached over HTTP, one endpoint per stage
pub struct HttpBackend {
    name: String,
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpBackend {
    /// Create a new HTTP backend
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        bearer_token: Option<String>,
        timeout_ms: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.filter(|t| !t.is_empty()),
        })
    }

    /// Create the backend described by the `[backend]` configuration section
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(
            "generation-service",
            &config.base_url,
            config.bearer_token.clone(),
            config.timeout_ms,
        )
    }

    /// Full URL of a stage endpoint
    pub fn endpoint(&self, stage: Stage) -> String {
        format!("{}{}", self.base_url, stage.route_path())
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, stage: Stage, body: Value) -> Result<Envelope> {
        let url = self.endpoint(stage);

        debug!(backend = %self.name, stage = %stage, url = %url, "Sending stage request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(backend = %self.name, stage = %stage, "Stage request timed out");
                return Err(AppError::Timeout(format!("{} request to {} timed out", stage, url)));
            }
            Err(e) => return Err(AppError::HttpClient(e)),
        };

        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) if status.is_success() || !envelope.is_success() => {
                debug!(
                    backend = %self.name,
                    stage = %stage,
                    code = envelope.code,
                    "Received stage response"
                );
                Ok(envelope)
            }
            // A success envelope on an error status is not trustworthy
            Ok(_) | Err(_) if !status.is_success() => {
                warn!(backend = %self.name, stage = %stage, status = %status, "Backend returned error status");
                Err(AppError::Upstream {
                    code: i64::from(status.as_u16()),
                    message: format!("Backend returned {}: {}", status, text),
                })
            }
            _ => Err(AppError::Upstream {
                code: 502,
                message: "Failed to parse backend response".to_string(),
            }),
        }
    }
}
