//! # Template Model
//!
//! A [`Template`] is one card design: a front (and optionally back) background
//! image, a native canvas size, and an ordered list of [`Field`]s. Field
//! geometry is always in template-native pixels, never screen pixels.
//!
//! The same types serve the Rust API and the JSON API (camelCase keys):
//!
//! ```
//! use carteirinha::template::{FieldKind, Side, Template};
//!
//! let json = r#"{
//!     "id": "t1", "name": "Sócio", "frontImageUrl": "front.png",
//!     "width": 800, "height": 600,
//!     "fields": [{"id": "f1", "name": "Nome", "type": "text", "side": "front",
//!                 "x": 100, "y": 100, "width": 200, "height": 30}]
//! }"#;
//! let template: Template = serde_json::from_str(json).unwrap();
//! assert_eq!(template.fields[0].kind, FieldKind::Text);
//! assert_eq!(template.fields_on(Side::Front).count(), 1);
//! ```
//!
//! Fields are never edited in place. [`Template::replace_field`] builds a new
//! field from the old one plus a [`FieldPatch`] and swaps it in at the same
//! index, so no caller can hold a stale view of a moved field.

pub mod validate;

pub use validate::{ValidationReport, validate};

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Deserialize a present key (even `null`) as `Some(..)`, so a patch can
/// tell "clear this" apart from "leave it alone".
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// ENUMS
// ============================================================================

/// What a field holds and how it renders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text typed by the operator.
    #[default]
    Text,
    /// The holder's photo. At most one per template, always locked.
    Photo,
}

/// Face of the card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Front, Side::Back];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "front" | "frente" => Ok(Side::Front),
            "back" | "verso" => Ok(Side::Back),
            other => Err(format!("Unknown side '{}' (expected front or back)", other)),
        }
    }
}

/// Horizontal text alignment inside the field box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

// ============================================================================
// FIELD
// ============================================================================

/// Largest template width or height accepted.
pub const MAX_CANVAS_SIDE: u32 = 8192;

pub const DEFAULT_FONT_SIZE: f64 = 16.0;
/// Largest font size drawn; bigger values are clamped to it.
pub const MAX_FONT_SIZE: f64 = 512.0;
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_COLOR: &str = "#000000";

/// One placeable region on one side of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    /// Display name, also the placeholder drawn when no value is supplied.
    #[serde(alias = "label")]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub side: Side,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Advisory only; render and export never enforce it.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub locked: bool,
    /// Hint shown in fill-in forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
}

impl Field {
    /// Create a field with a fresh id and default flags.
    ///
    /// Photo fields always start locked.
    pub fn new(name: impl Into<String>, kind: FieldKind, side: Side, rect: Rect) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            side,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            required: false,
            locked: kind == FieldKind::Photo,
            placeholder: None,
            font_size: None,
            font_family: None,
            color: None,
            text_align: None,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn is_photo(&self) -> bool {
        self.kind == FieldKind::Photo
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
            .filter(|s| *s > 0.0)
            .map_or(DEFAULT_FONT_SIZE, |s| s.min(MAX_FONT_SIZE))
    }

    pub fn font_family(&self) -> &str {
        self.font_family.as_deref().unwrap_or(DEFAULT_FONT_FAMILY)
    }

    pub fn color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_COLOR)
    }

    pub fn text_align(&self) -> TextAlign {
        self.text_align.unwrap_or_default()
    }

    /// Build the replacement for this field with `patch` merged over it.
    pub fn patched(&self, patch: &FieldPatch) -> Field {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(x) = patch.x {
            next.x = x;
        }
        if let Some(y) = patch.y {
            next.y = y;
        }
        if let Some(width) = patch.width {
            next.width = width;
        }
        if let Some(height) = patch.height {
            next.height = height;
        }
        if let Some(required) = patch.required {
            next.required = required;
        }
        if let Some(locked) = patch.locked {
            next.locked = locked;
        }
        if let Some(placeholder) = &patch.placeholder {
            next.placeholder = placeholder.clone();
        }
        if let Some(font_size) = patch.font_size {
            next.font_size = font_size;
        }
        if let Some(font_family) = &patch.font_family {
            next.font_family = font_family.clone();
        }
        if let Some(color) = &patch.color {
            next.color = color.clone();
        }
        if let Some(text_align) = patch.text_align {
            next.text_align = text_align;
        }
        next
    }
}

/// Partial update of a field. `None` leaves the attribute untouched; the
/// nested options of style attributes allow clearing back to the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldPatch {
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub required: Option<bool>,
    pub locked: Option<bool>,
    #[serde(deserialize_with = "double_option")]
    pub placeholder: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub font_size: Option<Option<f64>>,
    #[serde(deserialize_with = "double_option")]
    pub font_family: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub text_align: Option<Option<TextAlign>>,
}

impl FieldPatch {
    pub fn geometry(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
            ..Default::default()
        }
    }

    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Axis-aligned rectangle in template-native pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Flip negative extents so the origin is the top-left corner.
    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Self::new(x, y, width, height)
    }

    /// Inclusive point-in-rect test.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Shift and shrink so the rectangle lies inside `0..w` × `0..h`.
    pub fn clamped_to(self, w: f64, h: f64) -> Self {
        let x = self.x.clamp(0.0, w);
        let y = self.y.clamp(0.0, h);
        let right = self.right().clamp(x, w);
        let bottom = self.bottom().clamp(y, h);
        Self::new(x, y, right - x, bottom - y)
    }

    /// Move without resizing so the rectangle lies inside `0..w` × `0..h`
    /// (when it fits at all).
    pub fn translated_into(self, w: f64, h: f64) -> Self {
        let x = self.x.min(w - self.width).max(0.0);
        let y = self.y.min(h - self.height).max(0.0);
        Self::new(x, y, self.width, self.height)
    }
}

// ============================================================================
// TEMPLATE
// ============================================================================

/// One card design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub front_image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_image_url: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Template {
    /// An empty template with the given canvas size.
    pub fn new(name: impl Into<String>, front_image_url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            front_image_url: front_image_url.into(),
            back_image_url: None,
            width,
            height,
            fields: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Fields on `side`, in declaration order.
    pub fn fields_on(&self, side: Side) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.side == side)
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn photo_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_photo())
    }

    /// Background image reference for `side`.
    pub fn image_url(&self, side: Side) -> Option<&str> {
        match side {
            Side::Front => Some(self.front_image_url.as_str()).filter(|u| !u.is_empty()),
            Side::Back => self.back_image_url.as_deref().filter(|u| !u.is_empty()),
        }
    }

    pub fn has_side(&self, side: Side) -> bool {
        self.image_url(side).is_some()
    }

    /// Swap the field `id` for a patched copy at the same position.
    ///
    /// Returns the new field, or `None` if no field has that id.
    pub fn replace_field(&mut self, id: &str, patch: &FieldPatch) -> Option<&Field> {
        let idx = self.fields.iter().position(|f| f.id == id)?;
        let next = self.fields[idx].patched(patch);
        self.fields[idx] = next;
        Some(&self.fields[idx])
    }

    /// Remove and return the field `id`.
    pub fn remove_field(&mut self, id: &str) -> Option<Field> {
        let idx = self.fields.iter().position(|f| f.id == id)?;
        Some(self.fields.remove(idx))
    }

    /// Apply a partial template update.
    pub fn apply(&mut self, patch: TemplatePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(url) = patch.front_image_url {
            self.front_image_url = url;
        }
        if let Some(url) = patch.back_image_url {
            self.back_image_url = url;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(fields) = patch.fields {
            self.fields = fields;
        }
    }
}

/// Payload for creating a template; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub front_image_url: String,
    #[serde(default)]
    pub back_image_url: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// Partial template update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplatePatch {
    pub name: Option<String>,
    pub front_image_url: Option<String>,
    /// `Some(None)` clears the back image.
    #[serde(deserialize_with = "double_option")]
    pub back_image_url: Option<Option<String>>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fields: Option<Vec<Field>>,
}

// ============================================================================
// GENERATED VALUES
// ============================================================================

/// Operator-supplied data for one field, consumed by render/export only.
#[derive(Debug, Clone)]
pub enum GeneratedValue {
    Text(String),
    Photo(DynamicImage),
}

/// Fill-in data keyed by field id.
#[derive(Debug, Clone, Default)]
pub struct GeneratedValues {
    values: HashMap<String, GeneratedValue>,
}

impl GeneratedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text values from a plain `fieldId -> text` map.
    pub fn from_text(map: HashMap<String, String>) -> Self {
        Self {
            values: map
                .into_iter()
                .map(|(k, v)| (k, GeneratedValue::Text(v)))
                .collect(),
        }
    }

    pub fn set_text(&mut self, field_id: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.values
            .insert(field_id.into(), GeneratedValue::Text(text.into()));
        self
    }

    pub fn set_photo(&mut self, field_id: impl Into<String>, photo: DynamicImage) -> &mut Self {
        self.values
            .insert(field_id.into(), GeneratedValue::Photo(photo));
        self
    }

    pub fn get(&self, field_id: &str) -> Option<&GeneratedValue> {
        self.values.get(field_id)
    }

    /// Non-empty text for `field_id`, if any.
    pub fn text(&self, field_id: &str) -> Option<&str> {
        match self.values.get(field_id) {
            Some(GeneratedValue::Text(t)) if !t.is_empty() => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn photo(&self, field_id: &str) -> Option<&DynamicImage> {
        match self.values.get(field_id) {
            Some(GeneratedValue::Photo(img)) => Some(img),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text_field(id: &str) -> Field {
        Field {
            id: id.to_string(),
            ..Field::new("Nome", FieldKind::Text, Side::Front, Rect::new(10.0, 10.0, 100.0, 30.0))
        }
    }

    #[test]
    fn test_normalized_flips_negative_extent() {
        let r = Rect::new(100.0, 80.0, -40.0, -30.0).normalized();
        assert_eq!(r, Rect::new(60.0, 50.0, 40.0, 30.0));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(0.0, 0.0));
        assert!(r.contains(10.0, 10.0));
        assert!(!r.contains(10.1, 5.0));
    }

    #[test]
    fn test_clamped_to_canvas() {
        let r = Rect::new(-10.0, 550.0, 100.0, 100.0).clamped_to(800.0, 600.0);
        assert_eq!(r, Rect::new(0.0, 550.0, 90.0, 50.0));
    }

    #[test]
    fn test_photo_field_starts_locked() {
        let f = Field::new("Foto", FieldKind::Photo, Side::Back, Rect::new(0.0, 0.0, 50.0, 50.0));
        assert!(f.locked);
        let t = Field::new("Nome", FieldKind::Text, Side::Front, Rect::new(0.0, 0.0, 50.0, 50.0));
        assert!(!t.locked);
    }

    #[test]
    fn test_replace_field_keeps_position() {
        let mut t = Template::new("T", "f.png", 800, 600);
        t.fields.push(text_field("a"));
        t.fields.push(text_field("b"));
        t.fields.push(text_field("c"));

        let moved = t.replace_field("b", &FieldPatch::position(300.0, 200.0)).unwrap();
        assert_eq!((moved.x, moved.y), (300.0, 200.0));

        let ids: Vec<_> = t.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(t.fields[1].width, 100.0);
    }

    #[test]
    fn test_style_defaults() {
        let f = text_field("a");
        assert_eq!(f.font_size(), 16.0);
        assert_eq!(f.font_family(), "Arial");
        assert_eq!(f.color(), "#000000");
        assert_eq!(f.text_align(), TextAlign::Left);
    }

    #[test]
    fn test_font_size_is_clamped() {
        let mut f = text_field("a");
        f.font_size = Some(40000.0);
        assert_eq!(f.font_size(), MAX_FONT_SIZE);
        f.font_size = Some(-3.0);
        assert_eq!(f.font_size(), DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_label_alias_and_camel_case() {
        let json = r#"{"id":"f","label":"Matrícula","type":"text","side":"back",
            "x":1,"y":2,"width":3,"height":4,"fontSize":22,"textAlign":"center"}"#;
        let f: Field = serde_json::from_str(json).unwrap();
        assert_eq!(f.name, "Matrícula");
        assert_eq!(f.side, Side::Back);
        assert_eq!(f.font_size(), 22.0);
        assert_eq!(f.text_align(), TextAlign::Center);

        let out = serde_json::to_value(&f).unwrap();
        assert_eq!(out["type"], "text");
        assert_eq!(out["fontSize"], 22.0);
    }

    #[test]
    fn test_template_patch_clears_back_image() {
        let mut t = Template::new("T", "f.png", 800, 600);
        t.back_image_url = Some("b.png".to_string());
        t.apply(TemplatePatch {
            back_image_url: Some(None),
            ..Default::default()
        });
        assert!(!t.has_side(Side::Back));
        assert!(t.has_side(Side::Front));
    }

    #[test]
    fn test_generated_text_ignores_empty() {
        let mut values = GeneratedValues::new();
        values.set_text("a", "").set_text("b", "Maria");
        assert_eq!(values.text("a"), None);
        assert_eq!(values.text("b"), Some("Maria"));
    }

    #[test]
    fn test_side_parse() {
        assert_eq!("Back".parse::<Side>().unwrap(), Side::Back);
        assert_eq!("frente".parse::<Side>().unwrap(), Side::Front);
        assert!("top".parse::<Side>().is_err());
    }
}
