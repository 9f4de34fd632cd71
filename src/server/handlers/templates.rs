//! Template CRUD and validation.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use super::super::error::{ApiError, ApiResult};
use super::super::state::AppState;
use crate::template::{NewTemplate, Side, Template, TemplatePatch, ValidationReport, validate};

/// GET /api/templates - All templates, newest first.
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Template>>> {
    Ok(Json(state.templates.list().await?))
}

/// POST /api/templates - Create a template.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewTemplate>,
) -> ApiResult<(StatusCode, Json<Template>)> {
    if new.name.trim().is_empty() {
        return Err(ApiError::bad_request("Template name is required"));
    }
    check_size(&state, Some(new.width), Some(new.height))?;
    let template = state.templates.create(new).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// Refuse canvas sizes the renderer would not draw.
fn check_size(state: &AppState, width: Option<u32>, height: Option<u32>) -> ApiResult<()> {
    let max = state.config.render.max_canvas_side;
    for side in [width, height].into_iter().flatten() {
        if side == 0 {
            return Err(ApiError::bad_request("Template width and height must be positive"));
        }
        if side > max {
            return Err(ApiError::bad_request(format!(
                "Template width and height must be at most {}px",
                max
            )));
        }
    }
    Ok(())
}

/// GET /api/templates/:id
pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<Template>> {
    Ok(Json(state.templates.get(&id).await?))
}

/// PUT /api/templates/:id - Partial update.
///
/// Saving is not gated on validation; the report comes back alongside so the
/// editor can show what is still wrong.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<TemplatePatch>,
) -> ApiResult<Json<Value>> {
    if let Some(name) = &patch.name
        && name.trim().is_empty()
    {
        return Err(ApiError::bad_request("Template name is required"));
    }
    check_size(&state, patch.width, patch.height)?;
    let template = state.templates.update(&id, patch).await?;
    let report = validate(&template);
    if !report.is_valid {
        warn!(id = %id, errors = report.errors.len(), "Saved template is not valid yet");
    }
    Ok(Json(json!({ "template": template, "validation": report })))
}

/// DELETE /api/templates/:id - Remove the template and its images.
pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    state.templates.delete(&id).await?;
    for side in Side::ALL {
        state.images.delete(&id, side).await?;
    }
    info!(id = %id, "Template removed");
    Ok(Json(json!({ "success": true })))
}

/// GET /api/templates/:id/validate
pub async fn check(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ValidationReport>> {
    let template = state.templates.get(&id).await?;
    Ok(Json(validate(&template)))
}
