//! Common error types for the generation pipeline and proxy

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::traits::Envelope;

/// Domain code reported when the proxy itself failed to read or re-encode an image.
/// Backend domain codes are 0 or HTTP-like (4xx/5xx), so this never collides.
pub const TRANSCODING_ERROR_CODE: i64 = 1001;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("{0}")]
    Validation(String),

    #[error("A {0} generation is already in progress")]
    ConcurrencyRejection(String),

    #[error("Image transcoding failed: {0}")]
    Transcoding(String),

    #[error("{message}")]
    Upstream { code: i64, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure classes surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Preconditions not met; nothing was sent
    ValidationError,
    /// Trigger while another stage was running
    ConcurrencyRejection,
    /// The proxy could not resolve or refetch an image
    TranscodingError,
    /// The generator rejected the request or could not be reached
    UpstreamError,
}

impl AppError {
    /// Classify this error for the stage result
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::InvalidRequest(_) => ErrorKind::ValidationError,
            AppError::ConcurrencyRejection(_) => ErrorKind::ConcurrencyRejection,
            AppError::Transcoding(_) => ErrorKind::TranscodingError,
            AppError::Upstream { code, .. } if *code == TRANSCODING_ERROR_CODE => {
                ErrorKind::TranscodingError
            }
            _ => ErrorKind::UpstreamError,
        }
    }

    /// Domain code used in the response envelope
    pub fn domain_code(&self) -> i64 {
        match self {
            AppError::Transcoding(_) => TRANSCODING_ERROR_CODE,
            AppError::Upstream { code, .. } => *code,
            other => i64::from(other.status_code().as_u16()),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Json(_) | AppError::Validation(_) | AppError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::HttpClient(_) | AppError::Transcoding(_) | AppError::Upstream { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AppError::ConcurrencyRejection(_) => StatusCode::CONFLICT,
            AppError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(Envelope::failure(self.domain_code(), self.to_string()));

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
