//! # Rendering Module
//!
//! Turns a template plus fill-in values into a card image.
//!
//! ## Modules
//!
//! - [`draw`]: pixel primitives and color parsing
//! - [`text`]: text fields (Spleen bitmap faces or a runtime TTF)
//! - [`photo`]: photo fields and the empty-photo placeholder
//! - [`compositor`]: async assembly with stale-result detection
//!
//! ## Usage Example
//!
//! ```
//! use carteirinha::render::Renderer;
//! use carteirinha::template::{Field, FieldKind, GeneratedValues, Rect, Side, Template};
//!
//! let mut template = Template::new("Aluno", "front.png", 400, 250);
//! template.fields.push(Field::new("Nome", FieldKind::Text, Side::Front, Rect::new(20.0, 20.0, 200.0, 30.0)));
//!
//! let mut values = GeneratedValues::new();
//! values.set_text(template.fields[0].id.clone(), "Maria Silva");
//!
//! let card = Renderer::default().render_side(&template, Side::Front, None, &values).unwrap();
//! assert_eq!(card.dimensions(), (400, 250));
//! ```

pub mod compositor;
pub mod draw;
pub mod photo;
pub mod text;

pub use compositor::{Compositor, PhotoSource, RenderGeneration, RenderOutcome, RenderRequest, RenderTicket};

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::config::RenderConfig;
use crate::editor::{Editor, FieldView};
use crate::error::CarteirinhaError;
use crate::template::{
    DEFAULT_COLOR, Field, FieldKind, GeneratedValues, MAX_CANVAS_SIDE, Rect, Side, Template, TextAlign,
};
use draw::{BLACK, WHITE, fill_rect, parse_color, stroke_rect};
use text::TextRenderer;

const OUTLINE_TEXT: Rgba<u8> = Rgba([0x1e, 0x88, 0xe5, 255]);
const OUTLINE_PHOTO: Rgba<u8> = Rgba([0x43, 0xa0, 0x47, 255]);
const OUTLINE_SELECTED: Rgba<u8> = Rgba([0xff, 0x98, 0x00, 255]);
const OUTLINE_LOCKED: Rgba<u8> = Rgba([0x9e, 0x9e, 0x9e, 255]);
const TAG_PX: f64 = 12.0;

/// Draws cards. Holds only the font and the size limit; every call gets a
/// fresh surface.
#[derive(Debug, Clone)]
pub struct Renderer {
    text: TextRenderer,
    max_canvas_side: u32,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(TextRenderer::default())
    }
}

impl Renderer {
    pub fn new(text: TextRenderer) -> Self {
        Self {
            text,
            max_canvas_side: MAX_CANVAS_SIDE,
        }
    }

    /// Bitmap fonts unless the config names a font file.
    pub fn from_config(config: &RenderConfig) -> Result<Self, CarteirinhaError> {
        let text = match &config.font_path {
            Some(path) => TextRenderer::from_font_file(path)?,
            None => TextRenderer::default(),
        };
        Ok(Self {
            text,
            max_canvas_side: config.max_canvas_side,
        })
    }

    pub fn text(&self) -> &TextRenderer {
        &self.text
    }

    /// Render one side of a card at template resolution.
    ///
    /// The background is stretched to the full surface; without one the
    /// surface stays white. Fields are drawn in template order, so later
    /// fields paint over earlier ones.
    pub fn render_side(
        &self,
        template: &Template,
        side: Side,
        background: Option<&DynamicImage>,
        values: &GeneratedValues,
    ) -> Result<RgbaImage, CarteirinhaError> {
        let mut canvas = self.surface(template, background)?;
        for field in template.fields_on(side) {
            self.draw_field(&mut canvas, field, values);
        }
        debug!(
            template = %template.name,
            side = %side,
            fields = template.fields_on(side).count(),
            "Rendered card side"
        );
        Ok(canvas)
    }

    /// Draw one field: its value, or the fallback when there is none.
    pub fn draw_field(&self, canvas: &mut RgbaImage, field: &Field, values: &GeneratedValues) {
        let rect = field.rect();
        match field.kind {
            FieldKind::Text => {
                let text = values.text(&field.id).unwrap_or(&field.name);
                let color = parse_color(field.color()).unwrap_or_else(|| {
                    warn!(field = %field.name, color = %field.color(), "Unknown color, using {}", DEFAULT_COLOR);
                    BLACK
                });
                self.text
                    .draw(canvas, text, rect, field.font_size(), color, field.text_align());
            }
            FieldKind::Photo => match values.photo(&field.id) {
                Some(img) => photo::draw_photo(canvas, img, rect),
                None => photo::draw_placeholder(canvas, rect, &self.text),
            },
        }
    }

    /// Editor canvas at template resolution: background, then each visible
    /// field as an outline with its name tag. The provisional draft is
    /// dashed.
    pub fn render_editor_preview(
        &self,
        editor: &Editor,
        background: Option<&DynamicImage>,
    ) -> Result<RgbaImage, CarteirinhaError> {
        let mut canvas = self.surface(editor.template(), background)?;
        for view in editor.visible_fields() {
            self.draw_outline(&mut canvas, &view);
        }
        Ok(canvas)
    }

    fn draw_outline(&self, canvas: &mut RgbaImage, view: &FieldView) {
        let color = if view.selected {
            OUTLINE_SELECTED
        } else if view.locked && !view.provisional {
            OUTLINE_LOCKED
        } else if view.kind == FieldKind::Photo {
            OUTLINE_PHOTO
        } else {
            OUTLINE_TEXT
        };
        let dash = view.provisional.then_some((6, 4));
        stroke_rect(canvas, view.rect, color, 2, dash);

        let (label_w, _) = self.text.measure(&view.name, TAG_PX);
        let tag = Rect::new(view.rect.x, view.rect.y - TAG_PX - 4.0, label_w + 6.0, TAG_PX + 4.0);
        let tag = if tag.y < 0.0 {
            Rect::new(tag.x, view.rect.y, tag.width, tag.height)
        } else {
            tag
        };
        fill_rect(canvas, tag, color);
        self.text
            .draw(canvas, &view.name, tag, TAG_PX, WHITE, TextAlign::Center);
    }

    fn surface(&self, template: &Template, background: Option<&DynamicImage>) -> Result<RgbaImage, CarteirinhaError> {
        let (w, h) = (template.width, template.height);
        if w == 0 || h == 0 {
            return Err(CarteirinhaError::Validation(format!(
                "Template size {}x{} cannot be rendered",
                w, h
            )));
        }
        if w > self.max_canvas_side || h > self.max_canvas_side {
            return Err(CarteirinhaError::Validation(format!(
                "Template size {}x{} exceeds the {}px limit",
                w, h, self.max_canvas_side
            )));
        }
        Ok(match background {
            Some(bg) if bg.width() == w && bg.height() == h => bg.to_rgba8(),
            Some(bg) => imageops::resize(&bg.to_rgba8(), w, h, FilterType::Triangle),
            None => RgbaImage::from_pixel(w, h, WHITE),
        })
    }
}
