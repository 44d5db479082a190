//! Upload store backing ephemeral image references

use std::path::PathBuf;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::artifact::{ImageArtifact, EPHEMERAL_SCHEME};
use crate::error::{AppError, Result};

/// Mime type used when neither the bytes nor the source declare one
pub const GENERIC_IMAGE_MIME: &str = "image/webp";

/// Raw bytes of an ephemeral upload together with what is known of its type
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Holds uploaded images on disk and hands out `blob:` references to them
#[derive(Debug, Clone)]
pub struct UploadStore {
    upload_path: PathBuf,
}

impl UploadStore {
    /// Create a new upload store
    pub fn new(upload_path: impl Into<PathBuf>) -> Self {
        Self {
            upload_path: upload_path.into(),
        }
    }

    /// Ensure the upload directory exists
    pub async fn ensure_upload_dir(&self) -> Result<()> {
        if !self.upload_path.exists() {
            fs::create_dir_all(&self.upload_path).await?;
            debug!(path = ?self.upload_path, "Created upload directory");
        }
        Ok(())
    }

    /// Save raw upload bytes and return the ephemeral reference to them
    pub async fn save(&self, data: &[u8], declared_mime: Option<&str>) -> Result<ImageArtifact> {
        self.ensure_upload_dir().await?;

        let extension = detect_image_mime(data)
            .or(declared_mime)
            .and_then(extension_for_mime)
            .unwrap_or("bin");

        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        let file_path = self.upload_path.join(&filename);

        fs::write(&file_path, data).await?;

        debug!(path = ?file_path, size = data.len(), "Saved upload");

        Ok(ImageArtifact::Ephemeral(format!("{}{}", EPHEMERAL_SCHEME, filename)))
    }

    /// Read the bytes behind an ephemeral reference
    pub async fn read(&self, reference: &str) -> Result<UploadedImage> {
        let filename = upload_name(reference)?;
        let file_path = self.upload_path.join(filename);

        let data = fs::read(&file_path).await?;

        let mime_type = detect_image_mime(&data)
            .or_else(|| filename.rsplit_once('.').and_then(|(_, ext)| mime_for_extension(ext)))
            .map(str::to_string);

        debug!(reference = %reference, size = data.len(), mime = ?mime_type, "Read upload");

        Ok(UploadedImage { data, mime_type })
    }
}

/// Extract the file name from a `blob:` reference, refusing anything that could escape the store
fn upload_name(reference: &str) -> Result<&str> {
    let name = reference.strip_prefix(EPHEMERAL_SCHEME).ok_or_else(|| {
        AppError::InvalidRequest(format!("Not an ephemeral reference: {}", reference))
    })?;

    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AppError::InvalidRequest(format!(
            "Invalid upload reference: {}",
            reference
        )));
    }

    Ok(name)
}

/// Detect image mime type from binary data using magic bytes
pub fn detect_image_mime(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    // GIF: GIF87a or GIF89a
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("image/gif");
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    None
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
