//! Image resolution: turns background and photo references into decoded
//! images.
//!
//! A reference may be:
//! - a `data:` URI with base64 content,
//! - an `http(s)://` URL (downloaded once, then served from the cache),
//! - a `/images/...` URL handed out by the configured [`ImageStorage`],
//! - anything else is read as a local file path.
//!
//! Decoding runs on the blocking pool. Any failure is a
//! [`CarteirinhaError::ResourceLoad`]; callers must not draw a partial card.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::CarteirinhaError;
use crate::store::ImageStorage;

/// Downloads, reads and decodes images, caching remote ones by URL.
pub struct AssetLoader {
    http_client: reqwest::Client,
    storage: Option<Arc<dyn ImageStorage>>,
    cache: RwLock<HashMap<String, DynamicImage>>,
}

impl AssetLoader {
    pub fn new() -> Result<Self, CarteirinhaError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("carteirinha/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CarteirinhaError::ResourceLoad(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            http_client,
            storage: None,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Resolve `/images/...` URLs through `storage`.
    pub fn with_storage(mut self, storage: Arc<dyn ImageStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Load and decode the image behind `reference`.
    pub async fn load(&self, reference: &str) -> Result<DynamicImage, CarteirinhaError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(CarteirinhaError::ResourceLoad("No image reference given".to_string()));
        }

        if let Some(rest) = reference.strip_prefix("data:") {
            return decode(data_uri_bytes(rest)?).await;
        }

        if reference.starts_with("http://") || reference.starts_with("https://") {
            return self.load_remote(reference).await;
        }

        if let Some(storage) = &self.storage
            && reference.starts_with("/images/")
        {
            let (bytes, _mime) = storage
                .fetch(reference)
                .await
                .map_err(|e| CarteirinhaError::ResourceLoad(e.to_string()))?
                .ok_or_else(|| CarteirinhaError::ResourceLoad(format!("{} does not exist", reference)))?;
            return decode(bytes).await;
        }

        let bytes = tokio::fs::read(reference)
            .await
            .map_err(|e| CarteirinhaError::ResourceLoad(format!("{}: {}", reference, e)))?;
        decode(bytes).await
    }

    async fn load_remote(&self, url: &str) -> Result<DynamicImage, CarteirinhaError> {
        if let Some(image) = self.cache.read().await.get(url) {
            debug!(url = %url, "Image cache hit");
            return Ok(image.clone());
        }

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CarteirinhaError::ResourceLoad(format!("Failed to download {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(CarteirinhaError::ResourceLoad(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CarteirinhaError::ResourceLoad(format!("Failed to read image data: {}", e)))?;

        let image = decode(bytes.to_vec()).await?;
        self.cache.write().await.insert(url.to_string(), image.clone());
        Ok(image)
    }

    /// Forget cached downloads.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }
}

/// Decode image bytes on the blocking pool.
pub async fn decode(bytes: Vec<u8>) -> Result<DynamicImage, CarteirinhaError> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| CarteirinhaError::ResourceLoad(format!("Decode task failed: {}", e)))?
        .map_err(|e| CarteirinhaError::ResourceLoad(format!("Failed to decode image: {}", e)))
}

/// Payload of a `data:` URI (the part after `data:`). Only base64 payloads
/// are accepted.
fn data_uri_bytes(rest: &str) -> Result<Vec<u8>, CarteirinhaError> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| CarteirinhaError::ResourceLoad("Malformed data URI".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(CarteirinhaError::ResourceLoad(
            "Only base64 data URIs are supported".to_string(),
        ));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| CarteirinhaError::ResourceLoad(format!("Invalid base64 image data: {}", e)))
}
