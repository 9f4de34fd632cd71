//! # Persistence
//!
//! Two collaborators sit behind async traits:
//!
//! - [`TemplateStore`] keeps template records and assigns ids and timestamps.
//! - [`ImageStorage`] keeps background images and hands back the URL a
//!   template should reference.
//!
//! [`MemoryStore`] implements both in memory (tests, `serve` without a data
//! directory). [`DirStore`] implements both on disk: one JSON file per
//! template plus one image file per side.
//!
//! Failures surface as [`CarteirinhaError::Backend`] (or `NotFound`); nothing
//! here retries.

mod dir;
mod memory;

pub use dir::DirStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::CarteirinhaError;
use crate::template::{NewTemplate, Side, Template, TemplatePatch};
use crate::upload::UploadedFile;

/// Template records.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// All templates, newest first.
    async fn list(&self) -> Result<Vec<Template>, CarteirinhaError>;

    async fn get(&self, id: &str) -> Result<Template, CarteirinhaError>;

    async fn create(&self, new: NewTemplate) -> Result<Template, CarteirinhaError>;

    async fn update(&self, id: &str, patch: TemplatePatch) -> Result<Template, CarteirinhaError>;

    async fn delete(&self, id: &str) -> Result<(), CarteirinhaError>;
}

/// Background image files.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store the image for one side of a template and return its URL.
    /// Uploading again replaces the previous image.
    async fn upload(&self, template_id: &str, file: &UploadedFile, side: Side) -> Result<String, CarteirinhaError>;

    async fn delete(&self, template_id: &str, side: Side) -> Result<(), CarteirinhaError>;

    /// Bytes and MIME type behind a URL this storage handed out. `None` when
    /// the URL is not one of ours or the image is gone.
    async fn fetch(&self, url: &str) -> Result<Option<(Vec<u8>, String)>, CarteirinhaError>;
}

/// URL under which a stored image is served.
pub fn image_url(template_id: &str, side: Side) -> String {
    format!("/images/{}/{}", template_id, side)
}

/// Split a storage URL back into template id and side.
pub fn parse_image_url(url: &str) -> Option<(&str, Side)> {
    let rest = url.strip_prefix("/images/")?;
    let (id, side) = rest.split_once('/')?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some((id, side.parse().ok()?))
}

/// Record built from a creation payload.
pub(crate) fn new_record(new: NewTemplate) -> Template {
    let now = Utc::now();
    let mut template = Template::new(new.name, new.front_image_url, new.width, new.height);
    template.back_image_url = new.back_image_url;
    template.fields = new.fields;
    template.created_at = Some(now);
    template.updated_at = Some(now);
    template
}

/// Apply `patch` and bump `updated_at`.
pub(crate) fn patch_record(template: &mut Template, patch: TemplatePatch) {
    template.apply(patch);
    template.updated_at = Some(Utc::now());
}

pub(crate) fn sort_newest_first(templates: &mut [Template]) {
    templates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));
}
