//! Pixel primitives on RGBA surfaces: blending, fills, solid and dashed
//! outlines, and color parsing.

use image::{Rgba, RgbaImage};

use crate::template::Rect;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Integer pixel bounds `[x0, x1) × [y0, y1)` of `r`, clipped to the surface.
pub fn pixel_bounds(canvas: &RgbaImage, r: Rect) -> Option<(u32, u32, u32, u32)> {
    let x0 = r.x.round().max(0.0);
    let y0 = r.y.round().max(0.0);
    let x1 = r.right().round().min(canvas.width() as f64);
    let y1 = r.bottom().round().min(canvas.height() as f64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Blend `color` over the pixel at (x, y) with coverage `alpha` in [0, 1].
/// Out-of-bounds coordinates are ignored.
#[inline]
pub fn blend_pixel(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, alpha: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let a = (alpha * color[3] as f32 / 255.0).clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let p = canvas.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let v = p[c] as f32 * (1.0 - a) + color[c] as f32 * a;
        p[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    let out_a = p[3] as f32 / 255.0 + a * (1.0 - p[3] as f32 / 255.0);
    p[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

pub fn fill_rect(canvas: &mut RgbaImage, r: Rect, color: Rgba<u8>) {
    let Some((x0, y0, x1, y1)) = pixel_bounds(canvas, r) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            blend_pixel(canvas, x as i64, y as i64, color, 1.0);
        }
    }
}

/// Outline `r` with lines `thickness` px wide drawn inside the box.
/// `dash` is `(on, off)` in pixels; `None` draws a solid line.
pub fn stroke_rect(canvas: &mut RgbaImage, r: Rect, color: Rgba<u8>, thickness: u32, dash: Option<(u32, u32)>) {
    let x0 = r.x.round() as i64;
    let y0 = r.y.round() as i64;
    let x1 = r.right().round() as i64;
    let y1 = r.bottom().round() as i64;
    if x1 <= x0 || y1 <= y0 {
        return;
    }
    let t = thickness.max(1) as i64;
    let visible = |i: i64| match dash {
        Some((on, off)) if on + off > 0 => i.rem_euclid((on + off) as i64) < on as i64,
        _ => true,
    };

    for x in x0..x1 {
        if !visible(x - x0) {
            continue;
        }
        for k in 0..t {
            blend_pixel(canvas, x, y0 + k, color, 1.0);
            blend_pixel(canvas, x, y1 - 1 - k, color, 1.0);
        }
    }
    for y in y0..y1 {
        if !visible(y - y0) {
            continue;
        }
        for k in 0..t {
            blend_pixel(canvas, x0 + k, y, color, 1.0);
            blend_pixel(canvas, x1 - 1 - k, y, color, 1.0);
        }
    }
}

/// Parse a CSS-style color: `#rgb`, `#rrggbb`, `#rrggbbaa`, or a few names.
pub fn parse_color(s: &str) -> Option<Rgba<u8>> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return match hex.len() {
            3 => Some(Rgba([digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255])),
            6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
            8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
            _ => None,
        };
    }
    match s.to_lowercase().as_str() {
        "black" => Some(BLACK),
        "white" => Some(WHITE),
        "red" => Some(Rgba([255, 0, 0, 255])),
        "green" => Some(Rgba([0, 128, 0, 255])),
        "blue" => Some(Rgba([0, 0, 255, 255])),
        "gray" | "grey" => Some(Rgba([128, 128, 128, 255])),
        _ => None,
    }
}
