//! Background image upload, removal and serving.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
};
use serde_json::{Value, json};
use std::sync::Arc;

use super::super::error::{ApiError, ApiResult};
use super::super::state::AppState;
use super::{parse_side, read_image_field};
use crate::error::CarteirinhaError;
use crate::store;
use crate::template::{Side, TemplatePatch};

/// POST /api/templates/:id/images/:side - Upload a background (multipart
/// field `image`) and point the template at it.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path((id, side)): Path<(String, String)>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let side = parse_side(&side)?;
    state.templates.get(&id).await?;

    let file = read_image_field(&mut multipart).await?;
    let url = state.images.upload(&id, &file, side).await?;

    let patch = match side {
        Side::Front => TemplatePatch {
            front_image_url: Some(url.clone()),
            ..TemplatePatch::default()
        },
        Side::Back => TemplatePatch {
            back_image_url: Some(Some(url.clone())),
            ..TemplatePatch::default()
        },
    };
    let template = state.templates.update(&id, patch).await?;
    Ok(Json(json!({ "url": url, "template": template })))
}

/// DELETE /api/templates/:id/images/:side
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path((id, side)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let side = parse_side(&side)?;
    state.templates.get(&id).await?;
    state.images.delete(&id, side).await?;

    let patch = match side {
        Side::Front => TemplatePatch {
            front_image_url: Some(String::new()),
            ..TemplatePatch::default()
        },
        Side::Back => TemplatePatch {
            back_image_url: Some(None),
            ..TemplatePatch::default()
        },
    };
    let template = state.templates.update(&id, patch).await?;
    Ok(Json(json!({ "success": true, "template": template })))
}

/// GET /images/:id/:side - Serve a stored background.
pub async fn serve(
    State(state): State<Arc<AppState>>,
    Path((id, side)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let side = parse_side(&side)?;
    let url = store::image_url(&id, side);
    let (bytes, mime) = state
        .images
        .fetch(&url)
        .await?
        .ok_or_else(|| ApiError(CarteirinhaError::NotFound(format!("image {}", url))))?;
    Ok(([(header::CONTENT_TYPE, mime)], bytes))
}
