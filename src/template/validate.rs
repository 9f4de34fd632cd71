//! Structural checks a template must pass before it is usable.
//!
//! [`validate`] runs every rule and reports every violation, so a caller
//! never has to fix-and-retry to discover the next fault.

use serde::Serialize;
use std::collections::HashSet;

use super::{FieldKind, MAX_CANVAS_SIDE, Side, Template};

pub const MSG_NO_FIELDS: &str = "Template must have at least one field";
pub const MSG_NO_TEXT_FIELD: &str = "Template must have at least one text field";
pub const MSG_MULTIPLE_PHOTOS: &str = "Template may have at most one photo field";
pub const MSG_BACK_PHOTO_UNLOCKED: &str = "A photo field on the back side must be locked";

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Check every template invariant.
pub fn validate(template: &Template) -> ValidationReport {
    let mut errors = Vec::new();

    if template.name.trim().is_empty() {
        errors.push("Template name is required".to_string());
    }
    if template.front_image_url.trim().is_empty() {
        errors.push("Template must have a front image".to_string());
    }
    if template.width == 0 || template.height == 0 {
        errors.push(format!(
            "Template size must be positive (got {}x{})",
            template.width, template.height
        ));
    }
    if template.width > MAX_CANVAS_SIDE || template.height > MAX_CANVAS_SIDE {
        errors.push(format!(
            "Template size {}x{} exceeds the {}px limit",
            template.width, template.height, MAX_CANVAS_SIDE
        ));
    }

    if template.fields.is_empty() {
        errors.push(MSG_NO_FIELDS.to_string());
    } else if !template.fields.iter().any(|f| f.kind == FieldKind::Text) {
        errors.push(MSG_NO_TEXT_FIELD.to_string());
    }

    let mut seen = HashSet::new();
    for field in &template.fields {
        if !seen.insert(field.id.as_str()) {
            errors.push(format!("Duplicate field id '{}'", field.id));
        }
    }

    if template.photo_fields().count() > 1 {
        errors.push(MSG_MULTIPLE_PHOTOS.to_string());
    }
    if template
        .photo_fields()
        .any(|f| f.side == Side::Back && !f.locked)
    {
        errors.push(MSG_BACK_PHOTO_UNLOCKED.to_string());
    }

    let (w, h) = (template.width as f64, template.height as f64);
    for (idx, field) in template.fields.iter().enumerate() {
        let label = if field.name.trim().is_empty() {
            errors.push(format!("Field #{} has no name", idx + 1));
            format!("#{}", idx + 1)
        } else {
            format!("'{}'", field.name)
        };

        if !(field.width > 0.0 && field.height > 0.0) {
            errors.push(format!("Field {} must have a positive size", label));
        }
        if field.x < 0.0 || field.y < 0.0 || field.x + field.width > w || field.y + field.height > h {
            errors.push(format!(
                "Field {} lies outside the {}x{} canvas",
                label, template.width, template.height
            ));
        }
    }

    ValidationReport::from_errors(errors)
}
