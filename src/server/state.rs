//! Server state shared across handlers.

use image::DynamicImage;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::assets::AssetLoader;
use crate::config::Config;
use crate::error::CarteirinhaError;
use crate::export::Exporter;
use crate::render::{Compositor, Renderer};
use crate::store::{DirStore, ImageStorage, MemoryStore, TemplateStore};

/// A decoded fill-in photo waiting to be used in a render.
pub struct PhotoSession {
    pub image: DynamicImage,
    pub last_accessed: Instant,
}

impl PhotoSession {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            last_accessed: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: Config,
    pub templates: Arc<dyn TemplateStore>,
    pub images: Arc<dyn ImageStorage>,
    pub assets: Arc<AssetLoader>,
    pub exporter: Exporter,
    pub photo_sessions: RwLock<HashMap<String, PhotoSession>>,
}

impl AppState {
    pub fn new(
        config: Config,
        templates: Arc<dyn TemplateStore>,
        images: Arc<dyn ImageStorage>,
    ) -> Result<Self, CarteirinhaError> {
        let assets = Arc::new(AssetLoader::new()?.with_storage(images.clone()));
        let renderer = Renderer::from_config(&config.render)?;
        let compositor = Arc::new(Compositor::new(renderer, assets.clone()));
        Ok(Self {
            config,
            templates,
            images,
            assets,
            exporter: Exporter::new(compositor),
            photo_sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Everything in memory.
    pub fn in_memory(config: Config) -> Result<Self, CarteirinhaError> {
        let store = Arc::new(MemoryStore::with_upload_config(config.upload.clone()));
        Self::new(config, store.clone(), store)
    }

    /// On-disk store when `server.dataDir` is set, in memory otherwise.
    pub async fn open(config: Config) -> Result<Self, CarteirinhaError> {
        match config.server.data_dir.clone() {
            Some(dir) => {
                let store = Arc::new(DirStore::open(dir, config.upload.clone()).await?);
                Self::new(config, store.clone(), store)
            }
            None => Self::in_memory(config),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.config.server.photo_session_secs)
    }

    /// Drop photo sessions not used within the TTL. Returns how many went.
    pub async fn expire_sessions(&self, now: Instant) -> usize {
        let ttl = self.session_ttl();
        let mut sessions = self.photo_sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.last_accessed) < ttl);
        before - sessions.len()
    }
}
