use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use super::{ImageStorage, TemplateStore, image_url, new_record, parse_image_url, patch_record, sort_newest_first};
use crate::error::CarteirinhaError;
use crate::template::{NewTemplate, Side, Template, TemplatePatch};
use crate::upload::{UploadedFile, check_upload};
use crate::config::UploadConfig;

/// In-memory templates and images. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    templates: RwLock<HashMap<String, Template>>,
    images: RwLock<HashMap<(String, Side), (Vec<u8>, String)>>,
    upload: UploadConfig,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload_config(upload: UploadConfig) -> Self {
        Self {
            upload,
            ..Self::default()
        }
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Template>, CarteirinhaError> {
        let mut all: Vec<Template> = self.templates.read().await.values().cloned().collect();
        sort_newest_first(&mut all);
        Ok(all)
    }

    async fn get(&self, id: &str) -> Result<Template, CarteirinhaError> {
        self.templates
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CarteirinhaError::NotFound(format!("template {}", id)))
    }

    async fn create(&self, new: NewTemplate) -> Result<Template, CarteirinhaError> {
        let template = new_record(new);
        info!(id = %template.id, name = %template.name, "Template created");
        self.templates
            .write()
            .await
            .insert(template.id.clone(), template.clone());
        Ok(template)
    }

    async fn update(&self, id: &str, patch: TemplatePatch) -> Result<Template, CarteirinhaError> {
        let mut templates = self.templates.write().await;
        let template = templates
            .get_mut(id)
            .ok_or_else(|| CarteirinhaError::NotFound(format!("template {}", id)))?;
        patch_record(template, patch);
        Ok(template.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), CarteirinhaError> {
        if self.templates.write().await.remove(id).is_none() {
            return Err(CarteirinhaError::NotFound(format!("template {}", id)));
        }
        self.images.write().await.retain(|(tid, _), _| tid != id);
        info!(id = %id, "Template deleted");
        Ok(())
    }
}

#[async_trait]
impl ImageStorage for MemoryStore {
    async fn upload(&self, template_id: &str, file: &UploadedFile, side: Side) -> Result<String, CarteirinhaError> {
        let mime = check_upload(file, &self.upload)?;
        self.images
            .write()
            .await
            .insert((template_id.to_string(), side), (file.bytes.clone(), mime));
        Ok(image_url(template_id, side))
    }

    async fn delete(&self, template_id: &str, side: Side) -> Result<(), CarteirinhaError> {
        self.images
            .write()
            .await
            .remove(&(template_id.to_string(), side));
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<Option<(Vec<u8>, String)>, CarteirinhaError> {
        let Some((id, side)) = parse_image_url(url) else {
            return Ok(None);
        };
        Ok(self.images.read().await.get(&(id.to_string(), side)).cloned())
    }
}
