//! Virtual try-on generation pipeline
//!
//! Composes model prompts, routes each stage to its provider, proxies stage
//! requests while embedding every image that crosses the boundary, and
//! sequences the model, overlay and campaign stages for a single user.

pub mod api;
pub mod artifact;
pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod proxy;
pub mod render;
pub mod stage;

pub use error::{AppError, Result};

use std::sync::Arc;

use artifact::upload::UploadStore;
use backend::http_backend::HttpBackend;
use proxy::{RemoteFetcher, TranscodingProxy};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub proxy: Arc<TranscodingProxy>,
}

impl AppState {
    /// Wire the proxy to the configured generation service
    pub fn from_settings(settings: config::Settings) -> Result<Self> {
        let backend = HttpBackend::from_config(&settings.backend)?;
        let proxy = TranscodingProxy::new(
            Arc::new(backend),
            UploadStore::new(&settings.transcoding.upload_dir),
            RemoteFetcher::new(&settings.transcoding)?,
            settings.transcoding.default_mime_type.clone(),
        );

        Ok(Self {
            settings: Arc::new(settings),
            proxy: Arc::new(proxy),
        })
    }
}
