//! Base64 and data URL helpers for embedded images

use base64::{engine::general_purpose::STANDARD, Engine};
use crate::error::{AppError, Result};

const BASE64_MARKER: &str = ";base64,";

/// Encode binary data to base64 string
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode base64 string to binary data
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    // Accept both bare payloads and "data:image/png;base64,..." URLs
    let data = match parse_data_url(encoded) {
        Some((_, payload)) => payload,
        None => encoded,
    };

    STANDARD
        .decode(data.trim())
        .map_err(|e| AppError::InvalidRequest(format!("Invalid base64 data: {}", e)))
}

/// Split a data URL into its mime type and base64 payload.
/// The mime type is `None` when the URL omits it (`data:;base64,...`).
pub fn parse_data_url(data_url: &str) -> Option<(Option<&str>, &str)> {
    let rest = data_url.strip_prefix("data:")?;
    let marker = rest.find(BASE64_MARKER)?;
    let mime = &rest[..marker];
    let payload = &rest[marker + BASE64_MARKER.len()..];

    let mime = if mime.is_empty() { None } else { Some(mime) };
    Some((mime, payload))
}
