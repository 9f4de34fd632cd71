//! Text drawing for text fields and labels.
//!
//! Two faces are available:
//! - the built-in Spleen bitmap fonts, scaled nearest-neighbour to the
//!   requested pixel size (no font file needed);
//! - any TTF/OTF loaded at runtime, rasterized with anti-aliasing through
//!   `ab_glyph`.
//!
//! Text is always vertically centered in its box and clipped to it.

use ab_glyph::{Font, FontArc, ScaleFont};
use image::{Rgba, RgbaImage};
use spleen_font::{FONT_6X12, FONT_12X24, PSF2Font};
use std::path::Path;

use super::draw::blend_pixel;
use crate::error::CarteirinhaError;
use crate::template::{Rect, TextAlign};

/// Bitmap sizes at or above this use the 12×24 face; below it the 6×12.
const LARGE_FACE_MIN_PX: f64 = 18.0;

/// Font used to draw field text.
#[derive(Clone)]
pub enum TextFace {
    Bitmap,
    Ttf(FontArc),
}

impl std::fmt::Debug for TextFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextFace::Bitmap => f.write_str("Bitmap"),
            TextFace::Ttf(_) => f.write_str("Ttf"),
        }
    }
}

/// Draws single-line text into field boxes.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    face: TextFace,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::bitmap()
    }
}

impl TextRenderer {
    pub fn bitmap() -> Self {
        Self {
            face: TextFace::Bitmap,
        }
    }

    /// Load a TTF/OTF font file.
    pub fn from_font_file(path: &Path) -> Result<Self, CarteirinhaError> {
        let data = std::fs::read(path)?;
        let font = FontArc::try_from_vec(data).map_err(|e| {
            CarteirinhaError::ResourceLoad(format!("Invalid font {}: {}", path.display(), e))
        })?;
        Ok(Self {
            face: TextFace::Ttf(font),
        })
    }

    pub fn face(&self) -> &TextFace {
        &self.face
    }

    /// Width and line height of `text` at `size` px.
    pub fn measure(&self, text: &str, size: f64) -> (f64, f64) {
        match &self.face {
            TextFace::Bitmap => {
                let (w, h, _) = bitmap_face(size);
                let scale = size / h as f64;
                (text.chars().count() as f64 * w as f64 * scale, size)
            }
            TextFace::Ttf(font) => {
                let scaled = font.as_scaled(size as f32);
                let width: f32 = text
                    .chars()
                    .map(|ch| scaled.h_advance(font.glyph_id(ch)))
                    .sum();
                (width as f64, (scaled.ascent() - scaled.descent()) as f64)
            }
        }
    }

    /// Draw `text` inside `rect`: horizontally per `align`, vertically
    /// centered, clipped to the box.
    pub fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        rect: Rect,
        size: f64,
        color: Rgba<u8>,
        align: TextAlign,
    ) {
        if text.is_empty() || size <= 0.0 || rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let (text_width, line_height) = self.measure(text, size);
        let left = match align {
            TextAlign::Left => rect.x,
            TextAlign::Center => rect.x + (rect.width - text_width) / 2.0,
            TextAlign::Right => rect.right() - text_width,
        };
        let top = rect.y + (rect.height - line_height) / 2.0;
        let clip = Clip::new(rect);

        match &self.face {
            TextFace::Bitmap => draw_bitmap(canvas, text, left, top, size, color, &clip),
            TextFace::Ttf(font) => draw_ttf(canvas, font, text, left, top, size, color, &clip),
        }
    }
}

struct Clip {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl Clip {
    fn new(r: Rect) -> Self {
        Self {
            x0: r.x.floor() as i64,
            y0: r.y.floor() as i64,
            x1: r.right().ceil() as i64,
            y1: r.bottom().ceil() as i64,
        }
    }

    #[inline]
    fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Spleen face closest to `size`: (glyph width, glyph height, PSF2 data).
fn bitmap_face(size: f64) -> (usize, usize, &'static [u8]) {
    if size >= LARGE_FACE_MIN_PX {
        (12, 24, FONT_12X24)
    } else {
        (6, 12, FONT_6X12)
    }
}

/// Glyph bitmap as row-major on/off cells. Characters missing from the font
/// come back as a hollow box.
fn bitmap_glyph(font: Option<&mut PSF2Font>, ch: char, w: usize, h: usize) -> Vec<bool> {
    let mut cells = vec![false; w * h];
    let utf8 = ch.to_string();
    let mut found = false;
    if let Some(font) = font
        && let Some(glyph) = font.glyph_for_utf8(utf8.as_bytes())
    {
        for (row_y, row) in glyph.enumerate() {
            for (col_x, on) in row.enumerate() {
                if row_y < h && col_x < w {
                    cells[row_y * w + col_x] = on;
                }
            }
        }
        found = true;
    }

    if !found && !ch.is_whitespace() {
        for x in 0..w {
            cells[x] = true;
            cells[(h - 1) * w + x] = true;
        }
        for y in 0..h {
            cells[y * w] = true;
            cells[y * w + w - 1] = true;
        }
    }
    cells
}

fn draw_bitmap(canvas: &mut RgbaImage, text: &str, left: f64, top: f64, size: f64, color: Rgba<u8>, clip: &Clip) {
    let (gw, gh, data) = bitmap_face(size);
    let scale = size / gh as f64;
    let advance = gw as f64 * scale;
    let mut font = PSF2Font::new(data).ok();

    let cell_h = size.ceil() as i64;
    let cell_w = advance.ceil() as i64;
    let top_px = top.round() as i64;

    for (i, ch) in text.chars().enumerate() {
        let origin_x = (left + i as f64 * advance).round() as i64;
        if origin_x >= clip.x1 {
            break;
        }
        if origin_x + cell_w <= clip.x0 {
            continue;
        }
        let cells = bitmap_glyph(font.as_mut(), ch, gw, gh);

        // Only walk the part of the cell inside the clip box.
        let rows = (clip.y0 - top_px).max(0)..(clip.y1 - top_px).min(cell_h);
        let cols = (clip.x0 - origin_x).max(0)..(clip.x1 - origin_x).min(cell_w);
        for dy in rows {
            let sy = ((dy as f64 + 0.5) / scale) as usize;
            if sy >= gh {
                continue;
            }
            for dx in cols.clone() {
                let sx = ((dx as f64 + 0.5) / scale) as usize;
                if sx >= gw || !cells[sy * gw + sx] {
                    continue;
                }
                blend_pixel(canvas, origin_x + dx, top_px + dy, color, 1.0);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_ttf(
    canvas: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    left: f64,
    top: f64,
    size: f64,
    color: Rgba<u8>,
    clip: &Clip,
) {
    let px = size as f32;
    let scaled = font.as_scaled(px);
    let baseline_y = top as f32 + scaled.ascent();
    let mut caret_x = left as f32;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        let glyph = glyph_id.with_scale_and_position(px, ab_glyph::point(caret_x, baseline_y));
        caret_x += scaled.h_advance(glyph_id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            if bounds.min.x as i64 >= clip.x1 {
                break;
            }
            if (bounds.max.x as i64) < clip.x0 {
                continue;
            }
            outlined.draw(|gx, gy, coverage| {
                let x = gx as i64 + bounds.min.x as i64;
                let y = gy as i64 + bounds.min.y as i64;
                if clip.contains(x, y) {
                    blend_pixel(canvas, x, y, color, coverage);
                }
            });
        }
    }
}
