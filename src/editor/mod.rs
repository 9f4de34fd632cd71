//! # Template Editor
//!
//! Headless editing core: the host UI feeds pointer events in screen
//! coordinates, the editor maps them into template space, mutates the
//! template it owns and returns [`Action`]s describing what happened.
//!
//! ## Modes
//!
//! | Mode | pointer-down | pointer-move | pointer-up |
//! |------|--------------|--------------|------------|
//! | `Draw(kind)` | start a provisional field | stretch it | commit if big enough |
//! | `Select` | resize handle / move / select locked / pan | drag | report the update |
//!
//! All mutations happen inside a single `&mut self` call, so two edits can
//! never interleave. Fields are replaced, never edited in place (see
//! [`Template::replace_field`]).
//!
//! ```
//! use carteirinha::editor::{Editor, Mode, Point};
//! use carteirinha::template::{FieldKind, Template};
//!
//! let mut editor = Editor::new(Template::new("Sócio", "front.png", 800, 600));
//! editor.set_mode(Mode::Draw(FieldKind::Text));
//! editor.pointer_down(Point::new(100.0, 100.0), Some("Nome"));
//! editor.pointer_move(Point::new(300.0, 130.0));
//! editor.pointer_up(Point::new(300.0, 130.0));
//!
//! assert_eq!(editor.template().fields.len(), 1);
//! assert_eq!(editor.template().fields[0].width, 200.0);
//! ```

pub mod hit;
pub mod viewport;

pub use hit::Edge;
pub use viewport::{Point, Viewport};

use serde::Serialize;

use crate::config::EditorConfig;
use crate::error::CarteirinhaError;
use crate::template::{self, Field, FieldKind, FieldPatch, Rect, Side, Template, TextAlign, ValidationReport};

pub const MSG_PHOTO_EXISTS: &str = "Only one photo field is allowed per template";
pub const MSG_BACK_PHOTO_EXISTS: &str = "The back side already has a photo field";
pub const MSG_LOCKED_DELETE: &str = "Locked fields cannot be deleted";
pub const MSG_LOCKED_EDIT: &str = "Locked fields cannot be moved or resized";
pub const MSG_PHOTO_ALWAYS_LOCKED: &str = "Photo fields are always locked";

// ============================================================================
// PUBLIC TYPES
// ============================================================================

/// What pointer-down does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "mode", content = "kind")]
pub enum Mode {
    /// Select, move and resize existing fields; empty space pans.
    #[default]
    Select,
    /// Draw a new field of the given kind.
    Draw(FieldKind),
}

/// Outcome of an editor event, for the host to act on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum Action {
    FieldCreated { field: Field },
    FieldUpdated { field: Field },
    FieldDeleted { id: String },
    SelectionChanged { id: Option<String> },
    /// User-facing message; the triggering gesture applied no mutation.
    Notice { message: String },
    RenderNeeded,
}

impl Action {
    fn notice(message: impl Into<String>) -> Self {
        Action::Notice {
            message: message.into(),
        }
    }
}

/// A field being drawn. Extents may be negative while the user drags
/// up or left; [`Draft::rect`] normalizes them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub name: String,
    pub kind: FieldKind,
    pub side: Side,
    pub anchor: Point,
    pub width: f64,
    pub height: f64,
}

impl Draft {
    pub fn rect(&self) -> Rect {
        Rect::new(self.anchor.x, self.anchor.y, self.width, self.height).normalized()
    }
}

/// A field as the canvas should draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub id: Option<String>,
    pub name: String,
    pub kind: FieldKind,
    pub rect: Rect,
    pub locked: bool,
    pub selected: bool,
    /// Still being drawn; not part of the template yet.
    pub provisional: bool,
}

#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Drawing(Draft),
    Moving {
        id: String,
        start: Point,
        orig: Rect,
    },
    Resizing {
        id: String,
        edge: Edge,
        start: Point,
        orig: Rect,
    },
    Panning {
        last_screen: Point,
    },
}

// ============================================================================
// EDITOR
// ============================================================================

/// Single-writer owner of the template being designed.
#[derive(Debug, Clone)]
pub struct Editor {
    template: Template,
    viewport: Viewport,
    side: Side,
    mode: Mode,
    selected: Option<String>,
    gesture: Gesture,
    config: EditorConfig,
}

impl Editor {
    /// Edit `template` with the default configuration.
    pub fn new(template: Template) -> Self {
        Self::with_config(template, EditorConfig::default())
    }

    pub fn with_config(template: Template, config: EditorConfig) -> Self {
        Self {
            template,
            viewport: Viewport::new(config.min_zoom, config.max_zoom),
            side: Side::Front,
            mode: Mode::Select,
            selected: None,
            gesture: Gesture::Idle,
            config,
        }
    }

    // --- Accessors ---

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn into_template(self) -> Template {
        self.template
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selected(&self) -> Option<&Field> {
        self.selected.as_deref().and_then(|id| self.template.field(id))
    }

    /// The provisional field, while a draw gesture is in progress.
    pub fn draft(&self) -> Option<&Draft> {
        match &self.gesture {
            Gesture::Drawing(d) => Some(d),
            _ => None,
        }
    }

    pub fn validate(&self) -> ValidationReport {
        template::validate(&self.template)
    }

    /// Committed fields on the active side plus the draft, in draw order.
    pub fn visible_fields(&self) -> Vec<FieldView> {
        let mut views: Vec<FieldView> = self
            .template
            .fields_on(self.side)
            .map(|f| FieldView {
                id: Some(f.id.clone()),
                name: f.name.clone(),
                kind: f.kind,
                rect: f.rect(),
                locked: f.locked,
                selected: self.selected.as_deref() == Some(f.id.as_str()),
                provisional: false,
            })
            .collect();

        if let Some(draft) = self.draft() {
            views.push(FieldView {
                id: None,
                name: draft.name.clone(),
                kind: draft.kind,
                rect: draft.rect(),
                locked: draft.kind == FieldKind::Photo,
                selected: false,
                provisional: true,
            });
        }
        views
    }

    // --- Whole-state changes ---

    /// Replace the template (e.g. after loading from the store).
    pub fn load(&mut self, template: Template) -> Vec<Action> {
        self.template = template;
        self.gesture = Gesture::Idle;
        self.selected = None;
        vec![Action::SelectionChanged { id: None }, Action::RenderNeeded]
    }

    /// Switch the face being edited. The other face's fields are kept.
    pub fn set_side(&mut self, side: Side) -> Vec<Action> {
        if side == self.side {
            return Vec::new();
        }
        self.side = side;
        self.gesture = Gesture::Idle;
        let mut actions = Vec::new();
        if self.selected.take().is_some() {
            actions.push(Action::SelectionChanged { id: None });
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.gesture = Gesture::Idle;
    }

    /// Drop any in-progress gesture. A draft is discarded.
    pub fn cancel_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => Vec::new(),
            _ => vec![Action::RenderNeeded],
        }
    }

    // --- Viewport ---

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_by(self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_by(1.0 / self.config.zoom_step);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom);
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    /// Call when the active side's background has decoded.
    pub fn set_image_size(&mut self, natural_width: u32, natural_height: u32) {
        self.viewport
            .set_image_size(natural_width, natural_height, &self.template);
    }

    // --- Pointer events ---

    /// Pointer pressed at `screen`. `name` is the label for a field about to
    /// be drawn; it is ignored outside draw mode.
    pub fn pointer_down(&mut self, screen: Point, name: Option<&str>) -> Vec<Action> {
        let at = self.viewport.to_template(screen);
        match self.mode {
            Mode::Draw(kind) => self.begin_draw(at, kind, name),
            Mode::Select => self.begin_select(screen, at),
        }
    }

    /// Pointer moved to `screen` (with or without a gesture in progress).
    pub fn pointer_move(&mut self, screen: Point) -> Vec<Action> {
        let at = self.viewport.to_template(screen);
        match &mut self.gesture {
            Gesture::Idle => Vec::new(),
            Gesture::Drawing(draft) => {
                draft.width = at.x - draft.anchor.x;
                draft.height = at.y - draft.anchor.y;
                vec![Action::RenderNeeded]
            }
            Gesture::Moving { id, start, orig } => {
                let (w, h) = (self.template.width as f64, self.template.height as f64);
                let moved = Rect::new(
                    orig.x + (at.x - start.x),
                    orig.y + (at.y - start.y),
                    orig.width,
                    orig.height,
                )
                .translated_into(w, h);
                let id = id.clone();
                self.template
                    .replace_field(&id, &FieldPatch::position(moved.x, moved.y));
                vec![Action::RenderNeeded]
            }
            Gesture::Resizing {
                id,
                edge,
                start,
                orig,
            } => {
                let (w, h) = (self.template.width as f64, self.template.height as f64);
                let resized = hit::resize(
                    *orig,
                    *edge,
                    at.x - start.x,
                    at.y - start.y,
                    self.config.min_field_width,
                    self.config.min_field_height,
                );
                let resized = hit::clamp_resized(resized, *edge, w, h);
                let id = id.clone();
                self.template
                    .replace_field(&id, &FieldPatch::geometry(resized));
                vec![Action::RenderNeeded]
            }
            Gesture::Panning { last_screen } => {
                let (dx, dy) = (screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
                self.viewport.pan_by(dx, dy);
                vec![Action::RenderNeeded]
            }
        }
    }

    /// Pointer released at `screen`; finishes the current gesture.
    pub fn pointer_up(&mut self, screen: Point) -> Vec<Action> {
        self.pointer_move(screen);

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => Vec::new(),
            Gesture::Drawing(draft) => self.commit_draft(draft),
            Gesture::Moving { id, orig, .. } | Gesture::Resizing { id, orig, .. } => {
                match self.template.field(&id) {
                    Some(field) if field.rect() != orig => {
                        tracing::debug!(field = %field.name, x = field.x, y = field.y,
                            width = field.width, height = field.height, "field geometry changed");
                        vec![Action::FieldUpdated {
                            field: field.clone(),
                        }]
                    }
                    _ => Vec::new(),
                }
            }
            Gesture::Panning { .. } => vec![Action::RenderNeeded],
        }
    }

    fn begin_draw(&mut self, at: Point, kind: FieldKind, name: Option<&str>) -> Vec<Action> {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Vec::new();
        };

        if kind == FieldKind::Photo
            && let Err(e) = self.check_photo_rule(self.side)
        {
            return vec![Action::notice(e.to_string())];
        }

        self.gesture = Gesture::Drawing(Draft {
            name: name.to_string(),
            kind,
            side: self.side,
            anchor: at,
            width: 0.0,
            height: 0.0,
        });
        vec![Action::RenderNeeded]
    }

    fn commit_draft(&mut self, draft: Draft) -> Vec<Action> {
        let min = self.config.min_draw_size;
        if draft.width.abs() <= min || draft.height.abs() <= min {
            return vec![Action::RenderNeeded];
        }

        let rect = draft
            .rect()
            .clamped_to(self.template.width as f64, self.template.height as f64);
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return vec![Action::RenderNeeded];
        }

        let field = Field::new(draft.name, draft.kind, draft.side, rect);
        tracing::debug!(field = %field.name, kind = ?field.kind, side = %field.side, "field created");
        self.selected = Some(field.id.clone());
        self.template.fields.push(field.clone());

        vec![
            Action::FieldCreated { field },
            Action::SelectionChanged {
                id: self.selected.clone(),
            },
        ]
    }

    fn begin_select(&mut self, screen: Point, at: Point) -> Vec<Action> {
        // Resize handles of the current selection take priority.
        if let Some(field) = self.selected().filter(|f| f.side == self.side && !f.locked) {
            let on_screen = self.viewport.screen_rect(field.rect());
            if let Some(edge) = hit::edge_at(on_screen, screen, self.config.handle_tolerance) {
                self.gesture = Gesture::Resizing {
                    id: field.id.clone(),
                    edge,
                    start: at,
                    orig: field.rect(),
                };
                return Vec::new();
            }
        }

        let movable = hit::field_at(
            self.template.fields_on(self.side).filter(|f| !f.locked),
            at,
        );
        if let Some(field) = movable {
            let id = field.id.clone();
            self.gesture = Gesture::Moving {
                id: id.clone(),
                start: at,
                orig: field.rect(),
            };
            return self.change_selection(Some(id));
        }

        let locked = hit::field_at(self.template.fields_on(self.side).filter(|f| f.locked), at);
        if let Some(field) = locked {
            let id = field.id.clone();
            return self.change_selection(Some(id));
        }

        self.gesture = Gesture::Panning {
            last_screen: screen,
        };
        self.change_selection(None)
    }

    fn change_selection(&mut self, id: Option<String>) -> Vec<Action> {
        if self.selected == id {
            return Vec::new();
        }
        self.selected = id.clone();
        vec![Action::SelectionChanged { id }, Action::RenderNeeded]
    }

    /// Whether a photo field may be added on `side`.
    pub fn check_photo_rule(&self, side: Side) -> Result<(), CarteirinhaError> {
        if side == Side::Back && self.template.fields_on(Side::Back).any(Field::is_photo) {
            return Err(CarteirinhaError::Invariant(MSG_BACK_PHOTO_EXISTS.to_string()));
        }
        if self.template.photo_fields().next().is_some() {
            return Err(CarteirinhaError::Invariant(MSG_PHOTO_EXISTS.to_string()));
        }
        Ok(())
    }

    // --- Field commands ---

    /// Select a field by id, or clear the selection.
    pub fn select(&mut self, id: Option<&str>) -> Result<Vec<Action>, CarteirinhaError> {
        if let Some(id) = id
            && self.template.field(id).is_none()
        {
            return Err(CarteirinhaError::NotFound(format!("field '{}'", id)));
        }
        Ok(self.change_selection(id.map(str::to_string)))
    }

    /// Remove a field. Locked fields are refused.
    pub fn delete_field(&mut self, id: &str) -> Result<Action, CarteirinhaError> {
        let field = self
            .template
            .field(id)
            .ok_or_else(|| CarteirinhaError::NotFound(format!("field '{}'", id)))?;
        if field.locked {
            return Err(CarteirinhaError::Invariant(MSG_LOCKED_DELETE.to_string()));
        }

        self.template.remove_field(id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        if matches!(&self.gesture, Gesture::Moving { id: g, .. } | Gesture::Resizing { id: g, .. } if g == id)
        {
            self.gesture = Gesture::Idle;
        }
        tracing::debug!(field = id, "field deleted");
        Ok(Action::FieldDeleted { id: id.to_string() })
    }

    /// Apply a partial update through the same rules the pointer gestures
    /// follow.
    pub fn update_field(&mut self, id: &str, patch: &FieldPatch) -> Result<Action, CarteirinhaError> {
        let field = self
            .template
            .field(id)
            .ok_or_else(|| CarteirinhaError::NotFound(format!("field '{}'", id)))?;

        let moves = patch.x.is_some()
            || patch.y.is_some()
            || patch.width.is_some()
            || patch.height.is_some();
        if moves && field.locked && patch.locked != Some(false) {
            return Err(CarteirinhaError::Invariant(MSG_LOCKED_EDIT.to_string()));
        }
        if field.is_photo() && patch.locked == Some(false) {
            return Err(CarteirinhaError::Invariant(MSG_PHOTO_ALWAYS_LOCKED.to_string()));
        }
        if let Some(name) = &patch.name
            && name.trim().is_empty()
        {
            return Err(CarteirinhaError::Validation("Field name is required".to_string()));
        }

        let next = field.patched(patch).rect();
        let (w, h) = (self.template.width as f64, self.template.height as f64);
        if moves
            && (next.width <= 0.0
                || next.height <= 0.0
                || next.x < 0.0
                || next.y < 0.0
                || next.right() > w
                || next.bottom() > h)
        {
            return Err(CarteirinhaError::Invariant(format!(
                "Field '{}' must stay inside the {}x{} canvas",
                field.name, self.template.width, self.template.height
            )));
        }

        let field = self
            .template
            .replace_field(id, patch)
            .cloned()
            .ok_or_else(|| CarteirinhaError::NotFound(format!("field '{}'", id)))?;
        Ok(Action::FieldUpdated { field })
    }

    pub fn rename_field(&mut self, id: &str, name: &str) -> Result<Action, CarteirinhaError> {
        self.update_field(
            id,
            &FieldPatch {
                name: Some(name.trim().to_string()),
                ..Default::default()
            },
        )
    }

    pub fn set_required(&mut self, id: &str, required: bool) -> Result<Action, CarteirinhaError> {
        self.update_field(
            id,
            &FieldPatch {
                required: Some(required),
                ..Default::default()
            },
        )
    }

    /// Set text styling. `None` leaves an attribute as it is.
    pub fn set_field_style(
        &mut self,
        id: &str,
        font_size: Option<f64>,
        font_family: Option<&str>,
        color: Option<&str>,
        text_align: Option<TextAlign>,
    ) -> Result<Action, CarteirinhaError> {
        if let Some(size) = font_size
            && (size.is_nan() || size <= 0.0)
        {
            return Err(CarteirinhaError::Validation("Font size must be positive".to_string()));
        }
        self.update_field(
            id,
            &FieldPatch {
                font_size: font_size.map(Some),
                font_family: font_family.map(|f| Some(f.to_string())),
                color: color.map(|c| Some(c.to_string())),
                text_align: text_align.map(Some),
                ..Default::default()
            },
        )
    }

    /// Flip the lock on a text field. Photo fields stay locked.
    pub fn toggle_lock(&mut self, id: &str) -> Result<Action, CarteirinhaError> {
        let locked = self
            .template
            .field(id)
            .map(|f| f.locked)
            .ok_or_else(|| CarteirinhaError::NotFound(format!("field '{}'", id)))?;
        self.update_field(
            id,
            &FieldPatch {
                locked: Some(!locked),
                ..Default::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        let mut t = Template::new("Sócio", "front.png", 800, 600);
        t.back_image_url = Some("back.png".to_string());
        Editor::new(t)
    }

    fn draw(e: &mut Editor, kind: FieldKind, name: &str, from: (f64, f64), to: (f64, f64)) -> Vec<Action> {
        e.set_mode(Mode::Draw(kind));
        let mut actions = e.pointer_down(Point::new(from.0, from.1), Some(name));
        actions.extend(e.pointer_move(Point::new(to.0, to.1)));
        actions.extend(e.pointer_up(Point::new(to.0, to.1)));
        e.set_mode(Mode::Select);
        actions
    }

    fn notices(actions: &[Action]) -> Vec<String> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Notice { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_draw_commits_field() {
        let mut e = editor();
        let actions = draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (300.0, 130.0));

        assert!(actions.iter().any(|a| matches!(a, Action::FieldCreated { .. })));
        let f = &e.template().fields[0];
        assert_eq!(f.rect(), Rect::new(100.0, 100.0, 200.0, 30.0));
        assert_eq!(f.side, Side::Front);
        assert!(!f.locked);
        assert_eq!(e.selected().map(|f| f.name.as_str()), Some("Nome"));
    }

    #[test]
    fn test_draw_up_left_normalizes() {
        let mut e = editor();
        draw(&mut e, FieldKind::Text, "Nome", (300.0, 130.0), (100.0, 100.0));
        assert_eq!(e.template().fields[0].rect(), Rect::new(100.0, 100.0, 200.0, 30.0));
    }

    #[test]
    fn test_small_draw_is_discarded() {
        let mut e = editor();
        let actions = draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (110.0, 110.0));
        assert!(e.template().fields.is_empty());
        assert!(notices(&actions).is_empty());

        // Exactly the threshold is still too small.
        draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (120.0, 200.0));
        assert!(e.template().fields.is_empty());
    }

    #[test]
    fn test_draw_without_name_aborts() {
        let mut e = editor();
        e.set_mode(Mode::Draw(FieldKind::Text));
        assert!(e.pointer_down(Point::new(10.0, 10.0), None).is_empty());
        assert!(e.draft().is_none());
        e.pointer_down(Point::new(10.0, 10.0), Some("   "));
        e.pointer_up(Point::new(200.0, 200.0));
        assert!(e.template().fields.is_empty());
    }

    #[test]
    fn test_draw_is_clamped_to_canvas() {
        let mut e = editor();
        draw(&mut e, FieldKind::Text, "Nome", (700.0, 550.0), (900.0, 700.0));
        assert_eq!(e.template().fields[0].rect(), Rect::new(700.0, 550.0, 100.0, 50.0));
    }

    #[test]
    fn test_draw_maps_through_viewport() {
        let mut e = editor();
        e.set_zoom(2.0);
        e.set_mode(Mode::Draw(FieldKind::Text));
        e.pointer_down(Point::new(200.0, 200.0), Some("Nome"));
        e.pointer_up(Point::new(600.0, 260.0));
        assert_eq!(e.template().fields[0].rect(), Rect::new(100.0, 100.0, 200.0, 30.0));
    }

    #[test]
    fn test_draft_is_provisional_view() {
        let mut e = editor();
        e.set_mode(Mode::Draw(FieldKind::Text));
        e.pointer_down(Point::new(50.0, 50.0), Some("Nome"));
        e.pointer_move(Point::new(20.0, 90.0));

        let views = e.visible_fields();
        assert_eq!(views.len(), 1);
        assert!(views[0].provisional);
        assert_eq!(views[0].rect, Rect::new(20.0, 50.0, 30.0, 40.0));

        e.cancel_gesture();
        assert!(e.visible_fields().is_empty());
    }

    #[test]
    fn test_photo_is_locked_and_unique() {
        let mut e = editor();
        e.set_side(Side::Back);
        draw(&mut e, FieldKind::Photo, "Foto", (200.0, 200.0), (350.0, 350.0));
        assert_eq!(e.template().fields.len(), 1);
        assert!(e.template().fields[0].locked);

        let actions = draw(&mut e, FieldKind::Photo, "Foto 2", (400.0, 200.0), (500.0, 300.0));
        assert_eq!(notices(&actions), vec![MSG_BACK_PHOTO_EXISTS.to_string()]);
        assert_eq!(e.template().fields.len(), 1);

        e.set_side(Side::Front);
        let actions = draw(&mut e, FieldKind::Photo, "Foto 3", (400.0, 200.0), (500.0, 300.0));
        assert_eq!(notices(&actions), vec![MSG_PHOTO_EXISTS.to_string()]);
        assert_eq!(e.template().fields.len(), 1);
    }

    #[test]
    fn test_move_field() {
        let mut e = editor();
        draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (300.0, 130.0));

        e.pointer_down(Point::new(150.0, 110.0), None);
        e.pointer_move(Point::new(200.0, 150.0));
        let actions = e.pointer_up(Point::new(250.0, 210.0));

        let f = &e.template().fields[0];
        assert_eq!((f.x, f.y), (200.0, 200.0));
        assert_eq!((f.width, f.height), (200.0, 30.0));
        assert!(matches!(&actions[..], [Action::FieldUpdated { .. }]));
    }

    #[test]
    fn test_move_stays_in_canvas() {
        let mut e = editor();
        draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (300.0, 130.0));
        e.pointer_down(Point::new(150.0, 110.0), None);
        e.pointer_up(Point::new(2000.0, -500.0));
        let f = &e.template().fields[0];
        assert_eq!((f.x, f.y), (600.0, 0.0));
    }

    #[test]
    fn test_locked_field_selects_but_does_not_move() {
        let mut e = editor();
        draw(&mut e, FieldKind::Photo, "Foto", (200.0, 200.0), (350.0, 350.0));
        e.select(None).unwrap();

        let actions = e.pointer_down(Point::new(250.0, 250.0), None);
        assert!(actions.contains(&Action::SelectionChanged {
            id: Some(e.template().fields[0].id.clone())
        }));
        e.pointer_move(Point::new(400.0, 400.0));
        e.pointer_up(Point::new(400.0, 400.0));

        assert_eq!(e.template().fields[0].rect(), Rect::new(200.0, 200.0, 150.0, 150.0));
    }

    #[test]
    fn test_unlocked_field_under_locked_one_wins_move() {
        let mut e = editor();
        draw(&mut e, FieldKind::Photo, "Foto", (100.0, 100.0), (300.0, 300.0));
        draw(&mut e, FieldKind::Text, "Nome", (150.0, 150.0), (280.0, 190.0));
        e.select(None).unwrap();

        e.pointer_down(Point::new(160.0, 160.0), None);
        e.pointer_up(Point::new(170.0, 170.0));
        assert_eq!(e.template().fields[1].rect(), Rect::new(160.0, 160.0, 130.0, 40.0));
        assert_eq!(e.template().fields[0].rect(), Rect::new(100.0, 100.0, 200.0, 200.0));
    }

    #[test]
    fn test_empty_space_pans() {
        let mut e = editor();
        e.pointer_down(Point::new(10.0, 10.0), None);
        e.pointer_move(Point::new(30.0, 50.0));
        e.pointer_up(Point::new(40.0, 60.0));
        assert_eq!(e.viewport().pan(), Point::new(30.0, 50.0));
    }

    #[test]
    fn test_resize_left_edge() {
        let mut e = editor();
        draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (300.0, 150.0));

        e.pointer_down(Point::new(101.0, 125.0), None);
        e.pointer_up(Point::new(141.0, 125.0));
        assert_eq!(e.template().fields[0].rect(), Rect::new(140.0, 100.0, 160.0, 50.0));
    }

    #[test]
    fn test_resize_respects_minimums() {
        let mut e = editor();
        draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (300.0, 150.0));

        e.pointer_down(Point::new(299.0, 125.0), None);
        e.pointer_up(Point::new(0.0, 125.0));
        assert_eq!(e.template().fields[0].rect(), Rect::new(100.0, 100.0, 50.0, 50.0));

        e.pointer_down(Point::new(125.0, 100.0), None);
        e.pointer_up(Point::new(125.0, 500.0));
        assert_eq!(e.template().fields[0].rect(), Rect::new(100.0, 120.0, 50.0, 30.0));
    }

    #[test]
    fn test_delete_locked_is_refused() {
        let mut e = editor();
        draw(&mut e, FieldKind::Photo, "Foto", (200.0, 200.0), (350.0, 350.0));
        let before = e.template().fields.clone();
        let id = before[0].id.clone();

        let err = e.delete_field(&id).unwrap_err();
        assert_eq!(err.to_string(), MSG_LOCKED_DELETE);
        assert_eq!(e.template().fields, before);
    }

    #[test]
    fn test_delete_unlocked() {
        let mut e = editor();
        draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (300.0, 130.0));
        let id = e.template().fields[0].id.clone();
        assert_eq!(e.delete_field(&id).unwrap(), Action::FieldDeleted { id: id.clone() });
        assert!(e.template().fields.is_empty());
        assert!(e.selected().is_none());
        assert!(matches!(e.delete_field(&id), Err(CarteirinhaError::NotFound(_))));
    }

    #[test]
    fn test_sides_are_filtered_but_retained() {
        let mut e = editor();
        draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (300.0, 130.0));
        e.set_side(Side::Back);
        draw(&mut e, FieldKind::Text, "Validade", (400.0, 400.0), (600.0, 430.0));

        assert_eq!(e.template().fields.len(), 2);
        assert_eq!(e.visible_fields().len(), 1);
        assert_eq!(e.visible_fields()[0].name, "Validade");
        assert_eq!(e.template().fields[1].side, Side::Back);

        // A front field under the pointer is invisible from the back.
        e.select(None).unwrap();
        e.pointer_down(Point::new(150.0, 110.0), None);
        assert!(e.selected().is_none());
    }

    #[test]
    fn test_update_field_rules() {
        let mut e = editor();
        draw(&mut e, FieldKind::Photo, "Foto", (200.0, 200.0), (350.0, 350.0));
        draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (300.0, 130.0));
        let photo = e.template().fields[0].id.clone();
        let text = e.template().fields[1].id.clone();

        assert!(e.update_field(&photo, &FieldPatch::position(0.0, 0.0)).is_err());
        assert_eq!(e.toggle_lock(&photo).unwrap_err().to_string(), MSG_PHOTO_ALWAYS_LOCKED);
        assert!(e.rename_field(&text, "  ").is_err());
        assert!(e.update_field(&text, &FieldPatch::position(700.0, 0.0)).is_err());

        e.rename_field(&text, "Nome completo").unwrap();
        e.set_required(&text, true).unwrap();
        e.toggle_lock(&text).unwrap();
        let f = e.template().field(&text).unwrap();
        assert_eq!(f.name, "Nome completo");
        assert!(f.required && f.locked);
        assert_eq!(e.delete_field(&text).unwrap_err().to_string(), MSG_LOCKED_DELETE);
    }

    #[test]
    fn test_set_field_style() {
        let mut e = editor();
        draw(&mut e, FieldKind::Text, "Nome", (100.0, 100.0), (300.0, 130.0));
        let id = e.template().fields[0].id.clone();

        assert!(e.set_field_style(&id, Some(0.0), None, None, None).is_err());
        e.set_field_style(&id, Some(24.0), None, Some("#336699"), Some(TextAlign::Center))
            .unwrap();
        let f = e.template().field(&id).unwrap();
        assert_eq!(f.font_size(), 24.0);
        assert_eq!(f.font_family(), "Arial");
        assert_eq!(f.color(), "#336699");
        assert_eq!(f.text_align(), TextAlign::Center);
    }
}
