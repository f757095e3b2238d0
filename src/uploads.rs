// Image uploads shared by profile photos and community posts.
use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::DefaultBodyLimit;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Largest accepted image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Request body limit for routes that take one image. Leaves room for
/// multipart framing and text fields around the file.
pub fn body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)
}

/// An image read from a multipart field, validated but not yet stored.
#[derive(Debug)]
pub struct ImageUpload {
    pub extension: String,
    pub data: Bytes,
}

pub fn bad_upload(err: MultipartError) -> AppError {
    AppError::InvalidInput(format!("Invalid upload: {}", err.body_text()))
}

/// Read a file field, rejecting non-image content types, empty files and
/// anything over `MAX_IMAGE_BYTES`.
pub async fn read_image(field: Field<'_>) -> AppResult<ImageUpload> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !content_type.starts_with("image/") {
        return Err(AppError::InvalidInput("Upload must be an image".into()));
    }
    let extension = upload_extension(field.file_name(), &content_type);

    let data = field.bytes().await.map_err(bad_upload)?;
    check_size(data.len())?;

    Ok(ImageUpload { extension, data })
}

fn check_size(len: usize) -> AppResult<()> {
    if len == 0 {
        return Err(AppError::InvalidInput("Upload is empty".into()));
    }
    if len > MAX_IMAGE_BYTES {
        return Err(AppError::InvalidInput("Upload exceeds 5 MiB".into()));
    }
    Ok(())
}

/// Write the image under `dir` with a generated name and return its public
/// reference, `/uploads/<name>`.
pub async fn store_image(dir: &Path, image: &ImageUpload) -> AppResult<String> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create uploads dir: {e}")))?;

    let name = format!("{}.{}", uuid::Uuid::now_v7(), image.extension);
    tokio::fs::write(dir.join(&name), &image.data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store upload: {e}")))?;

    tracing::debug!("Stored upload {} ({} bytes)", name, image.data.len());
    Ok(format!("/uploads/{name}"))
}

/// File extension for a stored upload. The client's file name is trusted
/// only when its extension names an image type.
pub fn upload_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .filter(|ext| {
            mime_guess::from_ext(ext)
                .first()
                .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE)
        });

    from_name
        .or_else(|| {
            mime_guess::get_mime_extensions_str(content_type)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| "img".to_string())
}
