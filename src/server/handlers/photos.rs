//! Fill-in photo uploads.
//!
//! A photo is decoded once on upload and kept in an expiring session; render
//! requests refer to it by session id.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::super::error::ApiResult;
use super::super::state::{AppState, PhotoSession};
use super::read_image_field;
use crate::assets;
use crate::upload::check_upload;

#[derive(Debug, Serialize)]
pub struct PhotoUploadResponse {
    pub id: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

/// POST /api/photos - Upload a photo (multipart field `image`).
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<PhotoUploadResponse>> {
    let expired = state.expire_sessions(Instant::now()).await;
    if expired > 0 {
        debug!(expired, "Expired photo sessions");
    }

    let file = read_image_field(&mut multipart).await?;
    check_upload(&file, &state.config.upload)?;
    let image = assets::decode(file.bytes).await?;
    let (width, height) = (image.width(), image.height());

    let id = Uuid::new_v4().to_string();
    state
        .photo_sessions
        .write()
        .await
        .insert(id.clone(), PhotoSession::new(image));

    Ok(Json(PhotoUploadResponse {
        id,
        filename: file.file_name,
        width,
        height,
    }))
}
