//! Screen ↔ template coordinate mapping.
//!
//! Three things sit between a pointer position and a template pixel:
//!
//! ```text
//! screen = template * scale * zoom + pan
//! template = (screen - pan) / zoom / scale
//! ```
//!
//! - `scale` reconciles the background image's natural size with the
//!   template's declared size (the background is always drawn at template
//!   size, so one natural image pixel is `scale` template pixels apart).
//! - `zoom` is bounded to the configured range.
//! - `pan` is a screen-space translation of the whole canvas.

use serde::Serialize;

use crate::template::{Rect, Template};

/// A point in either space; which one is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pan/zoom/scale state of the editor canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
    scale_x: f64,
    scale_y: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.5, 3.0)
    }
}

impl Viewport {
    /// Identity mapping with the given zoom bounds.
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            zoom: 1.0_f64.clamp(min_zoom, max_zoom),
            pan_x: 0.0,
            pan_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            min_zoom,
            max_zoom,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        Point::new(self.pan_x, self.pan_y)
    }

    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    /// Set zoom, clamped to the configured range.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Multiply zoom by `factor`, clamped.
    pub fn zoom_by(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    pub fn set_pan(&mut self, x: f64, y: f64) {
        self.pan_x = x;
        self.pan_y = y;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Back to zoom 1 and no pan. Image scale is kept.
    pub fn reset(&mut self) {
        self.set_zoom(1.0);
        self.set_pan(0.0, 0.0);
    }

    /// Set the image scale directly. Non-positive factors are ignored.
    pub fn set_scale(&mut self, scale_x: f64, scale_y: f64) {
        if scale_x > 0.0 && scale_x.is_finite() {
            self.scale_x = scale_x;
        }
        if scale_y > 0.0 && scale_y.is_finite() {
            self.scale_y = scale_y;
        }
    }

    /// Recompute the image scale once a background image has decoded.
    pub fn set_image_size(&mut self, natural_width: u32, natural_height: u32, template: &Template) {
        if natural_width == 0 || natural_height == 0 {
            return;
        }
        self.set_scale(
            template.width as f64 / natural_width as f64,
            template.height as f64 / natural_height as f64,
        );
    }

    /// Template-space point → screen-space point.
    pub fn to_screen(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale_x * self.zoom + self.pan_x,
            p.y * self.scale_y * self.zoom + self.pan_y,
        )
    }

    /// Screen-space point → template-space point.
    pub fn to_template(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.pan_x) / self.zoom / self.scale_x,
            (p.y - self.pan_y) / self.zoom / self.scale_y,
        )
    }

    /// Template-space lengths → screen-space lengths (pan does not apply).
    pub fn to_screen_len(&self, w: f64, h: f64) -> (f64, f64) {
        (w * self.scale_x * self.zoom, h * self.scale_y * self.zoom)
    }

    /// Screen-space lengths → template-space lengths (pan does not apply).
    pub fn to_template_len(&self, dx: f64, dy: f64) -> (f64, f64) {
        (dx / self.zoom / self.scale_x, dy / self.zoom / self.scale_y)
    }

    /// On-screen box of a template-space rectangle.
    pub fn screen_rect(&self, r: Rect) -> Rect {
        let origin = self.to_screen(Point::new(r.x, r.y));
        let (width, height) = self.to_screen_len(r.width, r.height);
        Rect::new(origin.x, origin.y, width, height)
    }
}
