//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub backend: BackendConfig,
    pub transcoding: TranscodingConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Inbound authentication for the proxy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_rps() -> u32 {
    5
}

fn default_burst() -> u32 {
    10
}

/// Generation service the proxy forwards to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// Opaque credential attached to forwarded calls
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default = "default_backend_timeout")]
    pub timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_backend_timeout() -> u64 {
    180_000
}

/// Image transcoding configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodingConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_mime_type")]
    pub default_mime_type: String,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_mime_type() -> String {
    crate::artifact::upload::GENERIC_IMAGE_MIME.to_string()
}

fn default_max_image_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_fetch_timeout() -> u64 {
    30_000
}

/// Client-side orchestrator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Where the orchestrator reaches the transcoding proxy
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Upper bound on a single stage call
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_ms: u64,
}

fn default_proxy_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_stage_timeout() -> u64 {
    120_000
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_str().ok_or_else(|| {
            AppError::Config(config::ConfigError::Message(
                "Configuration path is not valid UTF-8".to_string(),
            ))
        })?;

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("auth.enabled", true)?
            .set_default("rate_limit.enabled", true)?
            .set_default("rate_limit.requests_per_second", i64::from(default_rps()))?
            .set_default("rate_limit.burst_size", i64::from(default_burst()))?
            .set_default("backend.base_url", default_backend_url())?
            .set_default("backend.timeout_ms", default_backend_timeout())?
            .set_default("transcoding.upload_dir", default_upload_dir())?
            .set_default("transcoding.default_mime_type", default_mime_type())?
            .set_default("transcoding.fetch_timeout_ms", default_fetch_timeout())?
            .set_default("pipeline.proxy_url", default_proxy_url())?
            .set_default("pipeline.stage_timeout_ms", default_stage_timeout())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            // Load from configuration file
            .add_source(File::with_name(path).required(false))
            // Override with environment variables (prefixed with VTON__)
            .add_source(
                Environment::with_prefix("VTON")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.backend.base_url.trim().is_empty() {
            return Err(invalid("Backend base_url cannot be empty"));
        }

        if self.backend.timeout_ms == 0 {
            return Err(invalid("Backend timeout_ms must be greater than 0"));
        }

        if self.transcoding.fetch_timeout_ms == 0 {
            return Err(invalid("Transcoding fetch_timeout_ms must be greater than 0"));
        }

        if self.transcoding.max_image_bytes == 0 {
            return Err(invalid("Transcoding max_image_bytes must be greater than 0"));
        }

        if !self.transcoding.default_mime_type.starts_with("image/") {
            return Err(invalid(&format!(
                "Transcoding default_mime_type '{}' is not an image type",
                self.transcoding.default_mime_type
            )));
        }

        if self.pipeline.stage_timeout_ms == 0 {
            return Err(invalid("Pipeline stage_timeout_ms must be greater than 0"));
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(invalid(&format!(
                "Logging format '{}' is invalid. Must be 'json' or 'pretty'",
                self.logging.format
            )));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            auth: AuthConfig {
                enabled: true,
                api_keys: vec![],
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_second: default_rps(),
                burst_size: default_burst(),
            },
            backend: BackendConfig {
                base_url: default_backend_url(),
                bearer_token: None,
                timeout_ms: default_backend_timeout(),
            },
            transcoding: TranscodingConfig {
                upload_dir: default_upload_dir(),
                default_mime_type: default_mime_type(),
                max_image_bytes: default_max_image_bytes(),
                fetch_timeout_ms: default_fetch_timeout(),
            },
            pipeline: PipelineConfig {
                proxy_url: default_proxy_url(),
                bearer_token: None,
                stage_timeout_ms: default_stage_timeout(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
