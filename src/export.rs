//! PNG export of rendered cards.
//!
//! Files are named `documento-{template}-{side}-{unix millis}.png`. The back
//! side can only be exported when the template has a back image; asking for
//! it otherwise fails before anything is written.

use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::CarteirinhaError;
use crate::render::Compositor;
use crate::template::{GeneratedValues, Side, Template};

/// `documento-{template}-{side}-{timestamp}.png`, timestamp in Unix millis.
pub fn export_file_name(template_name: &str, side: Side, timestamp: DateTime<Utc>) -> String {
    format!(
        "documento-{}-{}-{}.png",
        slug(template_name),
        side,
        timestamp.timestamp_millis()
    )
}

/// Filesystem-safe version of a template name: letters and digits are kept,
/// runs of anything else become one `-`.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "template".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CarteirinhaError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| CarteirinhaError::Image(format!("PNG encoding failed: {}", e)))?;
    Ok(out.into_inner())
}

/// A rendered, encoded card side ready to be saved or sent.
#[derive(Debug, Clone)]
pub struct ExportedCard {
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Renders card sides and writes them out as PNG files.
pub struct Exporter {
    compositor: Arc<Compositor>,
}

impl Exporter {
    pub fn new(compositor: Arc<Compositor>) -> Self {
        Self { compositor }
    }

    /// Render and encode one side without touching the filesystem.
    pub async fn export_bytes(
        &self,
        template: &Template,
        side: Side,
        values: &GeneratedValues,
    ) -> Result<ExportedCard, CarteirinhaError> {
        if side == Side::Back && !template.has_side(Side::Back) {
            return Err(CarteirinhaError::MissingBackImage);
        }
        let image = self.compositor.compose(template, side, values).await?;
        let png = encode_png(&image)?;
        Ok(ExportedCard {
            file_name: export_file_name(&template.name, side, Utc::now()),
            png,
        })
    }

    /// Render one side into `out_dir`. Returns the written path.
    pub async fn export_side(
        &self,
        out_dir: &Path,
        template: &Template,
        side: Side,
        values: &GeneratedValues,
    ) -> Result<PathBuf, CarteirinhaError> {
        let card = self.export_bytes(template, side, values).await?;
        tokio::fs::create_dir_all(out_dir).await?;
        let path = out_dir.join(&card.file_name);
        tokio::fs::write(&path, &card.png).await?;
        info!(path = %path.display(), size = card.png.len(), "Exported card");
        Ok(path)
    }

    /// Front, then back. Fails before rendering the back when the template
    /// has no back image; the front file is kept.
    pub async fn export_both(
        &self,
        out_dir: &Path,
        template: &Template,
        values: &GeneratedValues,
    ) -> Result<(PathBuf, PathBuf), CarteirinhaError> {
        let front = self.export_side(out_dir, template, Side::Front, values).await?;
        let back = self.export_side(out_dir, template, Side::Back, values).await?;
        Ok((front, back))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetLoader;
    use crate::render::Renderer;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn exporter() -> Exporter {
        let compositor = Compositor::new(Renderer::default(), Arc::new(AssetLoader::new().unwrap()));
        Exporter::new(Arc::new(compositor))
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("carteirinha-export-{}", uuid::Uuid::new_v4()))
    }

    fn background_file(dir: &Path) -> String {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join("bg.png");
        RgbaImage::from_pixel(8, 5, image::Rgba([255, 255, 255, 255]))
            .save(&path)
            .unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_file_name() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            export_file_name("Carteira Estudante", Side::Front, ts),
            "documento-Carteira-Estudante-front-1700000000123.png"
        );
        assert_eq!(
            export_file_name("  a/b\\c: São  ", Side::Back, ts),
            "documento-a-b-c-São-back-1700000000123.png"
        );
        assert_eq!(export_file_name("///", Side::Front, ts), "documento-template-front-1700000000123.png");
    }

    #[tokio::test]
    async fn test_back_without_image_writes_nothing() {
        let dir = scratch_dir();
        let bg = background_file(&dir.join("assets"));
        let template = Template::new("Aluno", bg, 80, 50);
        let out = dir.join("out");

        let err = exporter()
            .export_side(&out, &template, Side::Back, &GeneratedValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CarteirinhaError::MissingBackImage));
        assert!(!out.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_export_both_writes_front_then_back() {
        let dir = scratch_dir();
        let bg = background_file(&dir.join("assets"));
        let mut template = Template::new("Aluno", bg.clone(), 80, 50);
        template.back_image_url = Some(bg);
        let out = dir.join("out");

        let (front, back) = exporter()
            .export_both(&out, &template, &GeneratedValues::new())
            .await
            .unwrap();
        let front_name = front.file_name().unwrap().to_string_lossy().into_owned();
        let back_name = back.file_name().unwrap().to_string_lossy().into_owned();
        assert!(front_name.starts_with("documento-Aluno-front-"));
        assert!(back_name.starts_with("documento-Aluno-back-"));

        let decoded = image::open(&front).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (80, 50));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_export_both_stops_at_missing_back() {
        let dir = scratch_dir();
        let bg = background_file(&dir.join("assets"));
        let template = Template::new("Aluno", bg, 80, 50);
        let out = dir.join("out");

        let err = exporter()
            .export_both(&out, &template, &GeneratedValues::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CarteirinhaError::MissingBackImage));
        let written: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
        assert_eq!(written.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
