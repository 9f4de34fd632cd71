//! # Configuration
//!
//! Tunables for the editor, the upload boundary, the renderer and the HTTP
//! server. Every struct has a `Default` carrying the stock values and can be
//! loaded from a JSON file; CLI flags override individual fields.
//!
//! ```
//! use carteirinha::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.editor.min_draw_size, 20.0);
//! assert_eq!(config.upload.max_bytes, 5 * 1024 * 1024);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CarteirinhaError;
use crate::template::MAX_CANVAS_SIDE;

/// Editor interaction limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// A drawn rectangle must exceed this size (template px) on both axes.
    pub min_draw_size: f64,
    /// Resize never shrinks a field below this width.
    pub min_field_width: f64,
    /// Resize never shrinks a field below this height.
    pub min_field_height: f64,
    /// Lowest allowed zoom.
    pub min_zoom: f64,
    /// Highest allowed zoom.
    pub max_zoom: f64,
    /// Multiplier applied by one zoom-in / zoom-out step.
    pub zoom_step: f64,
    /// Distance in screen px within which a pointer grabs a resize handle.
    pub handle_tolerance: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_draw_size: 20.0,
            min_field_width: 50.0,
            min_field_height: 30.0,
            min_zoom: 0.5,
            max_zoom: 3.0,
            zoom_step: 1.2,
            handle_tolerance: 6.0,
        }
    }
}

/// File input boundary limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadConfig {
    /// Largest accepted upload in bytes.
    pub max_bytes: usize,
    /// Accepted MIME types.
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            allowed_mime_types: vec!["image/png".to_string(), "image/jpeg".to_string()],
        }
    }
}

/// Renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Optional TTF/OTF font used for text fields instead of the built-in
    /// bitmap font.
    pub font_path: Option<PathBuf>,
    /// Largest width or height a card may be rendered at.
    pub max_canvas_side: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            max_canvas_side: MAX_CANVAS_SIDE,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Directory for templates and uploaded images. `None` keeps everything
    /// in memory.
    pub data_dir: Option<PathBuf>,
    /// Seconds an uploaded fill-in photo stays available.
    pub photo_session_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            data_dir: None,
            photo_session_secs: 30 * 60,
        }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub editor: EditorConfig,
    pub upload: UploadConfig,
    pub render: RenderConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load a configuration file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, CarteirinhaError> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.check()?;
        Ok(config)
    }

    /// Reject configurations the editor cannot work with.
    pub fn check(&self) -> Result<(), CarteirinhaError> {
        let e = &self.editor;
        if !(e.min_zoom > 0.0 && e.min_zoom <= e.max_zoom) {
            return Err(CarteirinhaError::Validation(format!(
                "Invalid zoom range [{}, {}]",
                e.min_zoom, e.max_zoom
            )));
        }
        if e.min_draw_size < 0.0 || e.min_field_width <= 0.0 || e.min_field_height <= 0.0 {
            return Err(CarteirinhaError::Validation(
                "Minimum field sizes must be positive".to_string(),
            ));
        }
        if self.render.max_canvas_side == 0 {
            return Err(CarteirinhaError::Validation(
                "Canvas size limit must be positive".to_string(),
            ));
        }
        if self.upload.max_bytes == 0 {
            return Err(CarteirinhaError::Validation(
                "Upload size limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"editor":{"minDrawSize":10},"server":{"listenAddr":"0.0.0.0:9000"}}"#)
                .unwrap();
        assert_eq!(config.editor.min_draw_size, 10.0);
        assert_eq!(config.editor.min_field_width, 50.0);
        assert_eq!(config.server.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.upload.max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_check_rejects_inverted_zoom_range() {
        let mut config = Config::default();
        config.editor.min_zoom = 4.0;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().check().is_ok());
    }
}
