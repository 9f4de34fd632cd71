//! Async card assembly.
//!
//! Loading a background or decoding a photo takes time, and the template can
//! change while it happens. Every [`Compositor::render`] call therefore:
//!
//! 1. takes a snapshot of the template and a [`RenderTicket`];
//! 2. awaits the background and photo decodes;
//! 3. keeps only the photos addressed to a photo field on that side of the
//!    snapshot;
//! 4. draws on a fresh surface and reports [`RenderOutcome::Superseded`] if a
//!    newer render started in the meantime.
//!
//! The snapshot does not follow edits made during the awaits. A host that
//! edits the template begins a new render, and the ticket of the older one
//! goes stale. Nothing is cancelled; stale results are simply not used.

use image::{DynamicImage, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::Renderer;
use crate::assets::{self, AssetLoader};
use crate::error::CarteirinhaError;
use crate::template::{FieldKind, GeneratedValues, Side, Template};

/// Monotonic render counter shared by everyone rendering the same view.
#[derive(Debug, Clone, Default)]
pub struct RenderGeneration {
    latest: Arc<AtomicU64>,
}

impl RenderGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new render, superseding every earlier ticket.
    pub fn begin(&self) -> RenderTicket {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RenderTicket {
            generation,
            latest: Arc::clone(&self.latest),
        }
    }

    pub fn current(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

/// Identifies one render call.
#[derive(Debug, Clone)]
pub struct RenderTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl RenderTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// No newer render has started since this one.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

#[derive(Debug)]
pub enum RenderOutcome {
    Complete(RgbaImage),
    /// A newer render began before this one finished; discard.
    Superseded { generation: u64 },
}

impl RenderOutcome {
    pub fn into_image(self) -> Option<RgbaImage> {
        match self {
            RenderOutcome::Complete(img) => Some(img),
            RenderOutcome::Superseded { .. } => None,
        }
    }
}

/// Where a fill-in photo comes from.
#[derive(Debug, Clone)]
pub enum PhotoSource {
    /// Already decoded.
    Image(DynamicImage),
    /// Encoded PNG/JPEG bytes.
    Bytes(Vec<u8>),
    /// Anything [`AssetLoader::load`] understands.
    Reference(String),
}

/// Fill-in data for one render call.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub text: HashMap<String, String>,
    pub photos: HashMap<String, PhotoSource>,
}

impl RenderRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, field_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.text.insert(field_id.into(), value.into());
        self
    }

    pub fn photo(mut self, field_id: impl Into<String>, source: PhotoSource) -> Self {
        self.photos.insert(field_id.into(), source);
        self
    }
}

/// Loads what a card needs and hands it to the [`Renderer`].
pub struct Compositor {
    renderer: Renderer,
    assets: Arc<AssetLoader>,
    generation: RenderGeneration,
}

impl Compositor {
    pub fn new(renderer: Renderer, assets: Arc<AssetLoader>) -> Self {
        Self {
            renderer,
            assets,
            generation: RenderGeneration::new(),
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn assets(&self) -> &Arc<AssetLoader> {
        &self.assets
    }

    pub fn generation(&self) -> &RenderGeneration {
        &self.generation
    }

    /// Background for `side`, decoded. Fails without drawing anything.
    pub async fn load_background(&self, template: &Template, side: Side) -> Result<DynamicImage, CarteirinhaError> {
        match template.image_url(side) {
            Some(url) => self.assets.load(url).await,
            None if side == Side::Back => Err(CarteirinhaError::MissingBackImage),
            None => Err(CarteirinhaError::ResourceLoad(format!(
                "Template '{}' has no front image",
                template.name
            ))),
        }
    }

    /// Render with values that are already decoded. No staleness tracking.
    pub async fn compose(
        &self,
        template: &Template,
        side: Side,
        values: &GeneratedValues,
    ) -> Result<RgbaImage, CarteirinhaError> {
        let background = self.load_background(template, side).await?;
        self.renderer.render_side(template, side, Some(&background), values)
    }

    /// Render a snapshot of `template`, loading background and photos first.
    pub async fn render(
        &self,
        template: &Template,
        side: Side,
        request: RenderRequest,
    ) -> Result<RenderOutcome, CarteirinhaError> {
        let ticket = self.generation.begin();
        self.render_with_ticket(ticket, template, side, request).await
    }

    /// [`render`](Self::render) under a ticket the caller took earlier.
    pub async fn render_with_ticket(
        &self,
        ticket: RenderTicket,
        template: &Template,
        side: Side,
        request: RenderRequest,
    ) -> Result<RenderOutcome, CarteirinhaError> {
        let snapshot = template.clone();
        debug!(generation = ticket.generation(), template = %snapshot.name, side = %side, "Render started");

        let background = self.load_background(&snapshot, side).await?;

        let mut decoded = HashMap::with_capacity(request.photos.len());
        for (field_id, source) in request.photos {
            let image = match source {
                PhotoSource::Image(img) => img,
                PhotoSource::Bytes(bytes) => assets::decode(bytes).await?,
                PhotoSource::Reference(r) => self.assets.load(&r).await?,
            };
            decoded.insert(field_id, image);
        }

        if !ticket.is_current() {
            warn!(generation = ticket.generation(), "Dropping superseded render");
            return Ok(RenderOutcome::Superseded {
                generation: ticket.generation(),
            });
        }

        let values = fill_values(&snapshot, side, request.text, decoded);
        let renderer = self.renderer.clone();
        let image = tokio::task::spawn_blocking(move || {
            renderer.render_side(&snapshot, side, Some(&background), &values)
        })
        .await
        .map_err(|e| CarteirinhaError::Image(format!("Render task failed: {}", e)))??;

        if !ticket.is_current() {
            warn!(generation = ticket.generation(), "Dropping superseded render");
            return Ok(RenderOutcome::Superseded {
                generation: ticket.generation(),
            });
        }
        Ok(RenderOutcome::Complete(image))
    }
}

/// Combine text and decoded photos into values for `side` of `template`.
///
/// A photo is kept only if `template` has a photo field with that id on
/// `side`.
pub fn fill_values(
    template: &Template,
    side: Side,
    text: HashMap<String, String>,
    photos: HashMap<String, DynamicImage>,
) -> GeneratedValues {
    let mut values = GeneratedValues::from_text(text);
    for (field_id, image) in photos {
        match template.field(&field_id) {
            Some(f) if f.kind == FieldKind::Photo && f.side == side => {
                values.set_photo(field_id, image);
            }
            _ => warn!(field = %field_id, side = %side, "Dropping photo for a field that is not a photo on this side"),
        }
    }
    values
}
