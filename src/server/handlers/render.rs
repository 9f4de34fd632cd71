//! Card rendering for download.

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::super::error::{ApiError, ApiResult};
use super::super::state::AppState;
use super::parse_side;
use crate::error::CarteirinhaError;
use crate::render::compositor::fill_values;

/// Body of a render request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderBody {
    /// Text per field id.
    pub values: HashMap<String, String>,
    /// Photo session id per field id.
    pub photos: HashMap<String, String>,
}

/// POST /api/templates/:id/render/:side - Render one side as a PNG download.
pub async fn render(
    State(state): State<Arc<AppState>>,
    Path((id, side)): Path<(String, String)>,
    Json(body): Json<RenderBody>,
) -> ApiResult<impl IntoResponse> {
    let side = parse_side(&side)?;
    let template = state.templates.get(&id).await?;

    let photos = {
        let mut sessions = state.photo_sessions.write().await;
        let mut photos = HashMap::with_capacity(body.photos.len());
        for (field_id, session_id) in body.photos {
            let session = sessions.get_mut(&session_id).ok_or_else(|| {
                ApiError(CarteirinhaError::NotFound(format!(
                    "photo {} (session expired?)",
                    session_id
                )))
            })?;
            session.touch();
            photos.insert(field_id, session.image.clone());
        }
        photos
    };

    let values = fill_values(&template, side, body.values, photos);
    let card = state.exporter.export_bytes(&template, side, &values).await?;

    let ascii_name: String = card
        .file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' { c } else { '_' })
        .collect();
    let disposition = format!("attachment; filename=\"{}\"", ascii_name);
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        card.png,
    ))
}
