//! Photo fields: the supplied picture stretched into the box, or a dashed
//! placeholder when there is none yet.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use super::draw::{fill_rect, stroke_rect};
use super::text::TextRenderer;
use crate::template::{Rect, TextAlign};

const PLACEHOLDER_FILL: Rgba<u8> = Rgba([240, 240, 240, 255]);
const PLACEHOLDER_BORDER: Rgba<u8> = Rgba([0x88, 0x88, 0x88, 255]);
const PLACEHOLDER_LABEL: Rgba<u8> = Rgba([0x66, 0x66, 0x66, 255]);
const PLACEHOLDER_DASH: (u32, u32) = (8, 6);
const PLACEHOLDER_LABEL_PX: f64 = 14.0;

/// Resize `photo` to exactly the box size (aspect ratio is not kept) and
/// paint it at the box origin.
pub fn draw_photo(canvas: &mut RgbaImage, photo: &DynamicImage, rect: Rect) {
    let w = rect.width.round();
    let h = rect.height.round();
    if w < 1.0 || h < 1.0 {
        return;
    }
    let (w, h) = (w as u32, h as u32);
    let filter = if photo.width() > w * 2 || photo.height() > h * 2 {
        FilterType::Triangle
    } else {
        FilterType::Lanczos3
    };
    let resized = photo.resize_exact(w, h, filter).to_rgba8();
    imageops::overlay(canvas, &resized, rect.x.round() as i64, rect.y.round() as i64);
}

pub fn draw_placeholder(canvas: &mut RgbaImage, rect: Rect, text: &TextRenderer) {
    fill_rect(canvas, rect, PLACEHOLDER_FILL);
    stroke_rect(canvas, rect, PLACEHOLDER_BORDER, 2, Some(PLACEHOLDER_DASH));
    text.draw(
        canvas,
        "Photo",
        rect,
        PLACEHOLDER_LABEL_PX,
        PLACEHOLDER_LABEL,
        TextAlign::Center,
    );
}
