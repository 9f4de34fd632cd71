use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{ImageStorage, TemplateStore, image_url, new_record, parse_image_url, patch_record, sort_newest_first};
use crate::config::UploadConfig;
use crate::error::CarteirinhaError;
use crate::template::{NewTemplate, Side, Template, TemplatePatch};
use crate::upload::{UploadedFile, check_upload, extension_for};

const IMAGE_EXTENSIONS: [&str; 2] = ["png", "jpg"];

/// Templates and images under a data directory:
///
/// ```text
/// <root>/templates/<id>.json
/// <root>/images/<id>-<side>.<png|jpg>
/// ```
pub struct DirStore {
    root: PathBuf,
    upload: UploadConfig,
    /// Serializes read-modify-write cycles on template files.
    write_lock: Mutex<()>,
}

impl DirStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>, upload: UploadConfig) -> Result<Self, CarteirinhaError> {
        let root = root.into();
        fs::create_dir_all(root.join("templates"))
            .await
            .map_err(|e| backend("create templates directory", e))?;
        fs::create_dir_all(root.join("images"))
            .await
            .map_err(|e| backend("create images directory", e))?;
        info!(root = %root.display(), "Opened template directory");
        Ok(Self {
            root,
            upload,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn template_path(&self, id: &str) -> Result<PathBuf, CarteirinhaError> {
        Ok(self.root.join("templates").join(format!("{}.json", checked_id(id)?)))
    }

    fn image_path(&self, id: &str, side: Side, ext: &str) -> Result<PathBuf, CarteirinhaError> {
        Ok(self
            .root
            .join("images")
            .join(format!("{}-{}.{}", checked_id(id)?, side, ext)))
    }

    async fn read_template(&self, path: &Path) -> Result<Template, CarteirinhaError> {
        let text = fs::read_to_string(path).await.map_err(|e| backend("read template", e))?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn write_template(&self, template: &Template) -> Result<(), CarteirinhaError> {
        let path = self.template_path(&template.id)?;
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(template)?;
        fs::write(&tmp, json).await.map_err(|e| backend("write template", e))?;
        fs::rename(&tmp, &path).await.map_err(|e| backend("write template", e))?;
        Ok(())
    }

    async fn remove_images(&self, id: &str, side: Side) -> Result<(), CarteirinhaError> {
        for ext in IMAGE_EXTENSIONS {
            let path = self.image_path(id, side, ext)?;
            match fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "Removed image"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(backend("delete image", e)),
            }
        }
        Ok(())
    }
}

/// Ids become file names, so only a safe alphabet is accepted.
fn checked_id(id: &str) -> Result<&str, CarteirinhaError> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        Ok(id)
    } else {
        Err(CarteirinhaError::NotFound(format!("template {}", id)))
    }
}

fn backend(what: &str, e: std::io::Error) -> CarteirinhaError {
    CarteirinhaError::Backend(format!("Failed to {}: {}", what, e))
}

#[async_trait]
impl TemplateStore for DirStore {
    async fn list(&self) -> Result<Vec<Template>, CarteirinhaError> {
        let mut entries = fs::read_dir(self.root.join("templates"))
            .await
            .map_err(|e| backend("list templates", e))?;
        let mut templates = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| backend("list templates", e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_template(&path).await {
                Ok(t) => templates.push(t),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable template"),
            }
        }
        sort_newest_first(&mut templates);
        Ok(templates)
    }

    async fn get(&self, id: &str) -> Result<Template, CarteirinhaError> {
        let path = self.template_path(id)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(CarteirinhaError::NotFound(format!("template {}", id)));
        }
        self.read_template(&path).await
    }

    async fn create(&self, new: NewTemplate) -> Result<Template, CarteirinhaError> {
        let template = new_record(new);
        let _guard = self.write_lock.lock().await;
        self.write_template(&template).await?;
        info!(id = %template.id, name = %template.name, "Template created");
        Ok(template)
    }

    async fn update(&self, id: &str, patch: TemplatePatch) -> Result<Template, CarteirinhaError> {
        let _guard = self.write_lock.lock().await;
        let mut template = self.get(id).await?;
        patch_record(&mut template, patch);
        self.write_template(&template).await?;
        debug!(id = %id, "Template updated");
        Ok(template)
    }

    async fn delete(&self, id: &str) -> Result<(), CarteirinhaError> {
        let _guard = self.write_lock.lock().await;
        let path = self.template_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CarteirinhaError::NotFound(format!("template {}", id)));
            }
            Err(e) => return Err(backend("delete template", e)),
        }
        for side in Side::ALL {
            self.remove_images(id, side).await?;
        }
        info!(id = %id, "Template deleted");
        Ok(())
    }
}

#[async_trait]
impl ImageStorage for DirStore {
    async fn upload(&self, template_id: &str, file: &UploadedFile, side: Side) -> Result<String, CarteirinhaError> {
        let mime = check_upload(file, &self.upload)?;
        self.remove_images(template_id, side).await?;
        let path = self.image_path(template_id, side, extension_for(&mime))?;
        fs::write(&path, &file.bytes).await.map_err(|e| backend("store image", e))?;
        info!(template = %template_id, side = %side, size = file.bytes.len(), "Stored image");
        Ok(image_url(template_id, side))
    }

    async fn delete(&self, template_id: &str, side: Side) -> Result<(), CarteirinhaError> {
        self.remove_images(template_id, side).await
    }

    async fn fetch(&self, url: &str) -> Result<Option<(Vec<u8>, String)>, CarteirinhaError> {
        let Some((id, side)) = parse_image_url(url) else {
            return Ok(None);
        };
        for ext in IMAGE_EXTENSIONS {
            let Ok(path) = self.image_path(id, side, ext) else {
                return Ok(None);
            };
            match fs::read(&path).await {
                Ok(bytes) => {
                    let mime = mime_guess::from_path(&path).first_or_octet_stream();
                    return Ok(Some((bytes, mime.essence_str().to_string())));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(backend("read image", e)),
            }
        }
        Ok(None)
    }
}
