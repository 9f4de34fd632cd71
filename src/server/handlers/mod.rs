//! HTTP API handlers.

pub mod images;
pub mod photos;
pub mod render;
pub mod templates;

use axum::extract::Multipart;

use super::error::ApiError;
use crate::template::Side;
use crate::upload::UploadedFile;

/// Pull the `image` part out of a multipart body.
pub(crate) async fn read_image_field(multipart: &mut Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("unknown").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read image: {}", e)))?;
        return Ok(UploadedFile::new(file_name, content_type, bytes.to_vec()));
    }
    Err(ApiError::bad_request("No image field found"))
}

pub(crate) fn parse_side(side: &str) -> Result<Side, ApiError> {
    side.parse().map_err(ApiError::bad_request)
}
