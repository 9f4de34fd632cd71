//! # Carteirinha - ID-Card Template Designer and Renderer
//!
//! Carteirinha lays out fields on ID-card backgrounds and renders filled-in
//! cards to PNG. It provides:
//!
//! - **Field model**: templates with text and photo fields on a front and an
//!   optional back side
//! - **Editor**: pointer-driven drawing, moving and resizing of fields over a
//!   zoomable, pannable canvas
//! - **Validation**: the structural rules a template must meet before use
//! - **Rendering and export**: background plus field values, composited at
//!   template resolution and saved as PNG
//! - **HTTP API**: template storage, uploads and card downloads
//!
//! ## Quick Start
//!
//! ```
//! use carteirinha::editor::{Editor, Mode, viewport::Point};
//! use carteirinha::template::{FieldKind, Template};
//!
//! let mut editor = Editor::new(Template::new("Carteira Estudante", "frente.png", 800, 600));
//!
//! // Draw a text field from (100, 100) to (300, 130)
//! editor.set_mode(Mode::Draw(FieldKind::Text));
//! editor.pointer_down(Point::new(100.0, 100.0), Some("Nome"));
//! editor.pointer_up(Point::new(300.0, 130.0));
//!
//! let template = editor.into_template();
//! assert_eq!(template.fields.len(), 1);
//! assert!(carteirinha::template::validate(&template).is_valid);
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`template`] | Field model, templates, fill-in values, validation |
//! | [`editor`] | Editing state machine and coordinate mapping |
//! | [`render`] | Card rendering and async composition |
//! | [`export`] | PNG encoding and file naming |
//! | [`assets`] | Background/photo loading and decoding |
//! | [`upload`] | File input checks |
//! | [`store`] | Template and image persistence |
//! | [`server`] | HTTP API |
//! | [`config`] | Configuration |
//! | [`error`] | Error types |

pub mod assets;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod render;
pub mod server;
pub mod store;
pub mod template;
pub mod upload;

// Re-exports for convenience
pub use editor::Editor;
pub use error::CarteirinhaError;
pub use template::{Field, Template};
