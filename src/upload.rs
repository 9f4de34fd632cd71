//! File input boundary.
//!
//! Every image coming in from outside (template backgrounds, fill-in photos)
//! passes [`check_upload`] before anything decodes or stores it.

use image::ImageFormat;
use std::path::Path;
use tracing::warn;

use crate::config::UploadConfig;
use crate::error::CarteirinhaError;

/// A file as received from the user.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    /// Content type declared by the client, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Best guess at the MIME type: the magic bytes, then the declared type
    /// when it is specific, then the file extension.
    pub fn mime_type(&self) -> String {
        if let Ok(format) = image::guess_format(&self.bytes) {
            return format.to_mime_type().to_string();
        }
        if let Some(ct) = &self.content_type {
            let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            if !essence.is_empty() && essence != "application/octet-stream" {
                return essence;
            }
        }
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

/// Accept or reject a file. Returns its MIME type when accepted.
pub fn check_upload(file: &UploadedFile, config: &UploadConfig) -> Result<String, CarteirinhaError> {
    if file.bytes.is_empty() {
        warn!(file = %file.file_name, "Refused empty upload");
        return Err(CarteirinhaError::Validation("The file is empty".to_string()));
    }

    let mime = file.mime_type();
    if !config.allowed_mime_types.iter().any(|m| m.eq_ignore_ascii_case(&mime)) {
        warn!(file = %file.file_name, mime = %mime, "Refused upload type");
        return Err(CarteirinhaError::Validation(
            "Only PNG and JPEG images are allowed".to_string(),
        ));
    }

    if file.bytes.len() > config.max_bytes {
        warn!(file = %file.file_name, size = file.bytes.len(), "Refused oversized upload");
        return Err(CarteirinhaError::Validation(format!(
            "Image must be at most {}",
            format_size(config.max_bytes)
        )));
    }

    Ok(mime)
}

/// Read a local image file and run it through [`check_upload`].
pub async fn read_checked(path: &Path, config: &UploadConfig) -> Result<UploadedFile, CarteirinhaError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = UploadedFile::new(file_name, None, bytes);
    check_upload(&file, config)?;
    Ok(file)
}

/// File extension for a stored image of this MIME type.
pub fn extension_for(mime: &str) -> &'static str {
    match ImageFormat::from_mime_type(mime) {
        Some(ImageFormat::Jpeg) => "jpg",
        Some(ImageFormat::Png) => "png",
        _ => "bin",
    }
}

fn format_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes >= 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0];

    fn file(name: &str, ct: Option<&str>, bytes: &[u8]) -> UploadedFile {
        UploadedFile::new(name, ct.map(str::to_string), bytes.to_vec())
    }

    #[test]
    fn test_accepts_png_and_jpeg() {
        let config = UploadConfig::default();
        assert_eq!(check_upload(&file("a.png", Some("image/png"), PNG_MAGIC), &config).unwrap(), "image/png");
        assert_eq!(check_upload(&file("a.jpg", Some("image/jpeg"), JPEG_MAGIC), &config).unwrap(), "image/jpeg");
    }

    #[test]
    fn test_sniffs_when_content_type_missing() {
        let config = UploadConfig::default();
        let f = file("photo", None, JPEG_MAGIC);
        assert_eq!(check_upload(&f, &config).unwrap(), "image/jpeg");

        let f = file("photo.png", Some("application/octet-stream"), PNG_MAGIC);
        assert_eq!(check_upload(&f, &config).unwrap(), "image/png");
    }

    #[test]
    fn test_magic_bytes_beat_declared_type() {
        let config = UploadConfig::default();
        let gif = file("a.png", Some("image/png"), b"GIF89a\x01\x00\x01\x00");
        assert_eq!(gif.mime_type(), "image/gif");
        assert!(check_upload(&gif, &config).is_err());
    }

    #[test]
    fn test_falls_back_to_extension() {
        let f = file("scan.png", None, b"not really an image");
        assert_eq!(f.mime_type(), "image/png");
    }

    #[test]
    fn test_rejects_other_types() {
        let config = UploadConfig::default();
        let err = check_upload(&file("a.gif", Some("image/gif"), b"GIF89a...."), &config).unwrap_err();
        assert!(matches!(err, CarteirinhaError::Validation(_)));
        assert!(check_upload(&file("notes.txt", None, b"hello"), &config).is_err());
    }

    #[test]
    fn test_rejects_oversized() {
        let config = UploadConfig::default();
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(5 * 1024 * 1024 + 1, 0);
        let err = check_upload(&file("big.png", Some("image/png"), &bytes), &config).unwrap_err();
        assert_eq!(err.to_string(), "Image must be at most 5 MB");

        bytes.truncate(5 * 1024 * 1024);
        assert!(check_upload(&file("ok.png", Some("image/png"), &bytes), &config).is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(check_upload(&file("a.png", Some("image/png"), &[]), &UploadConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_read_checked_local_files() {
        let dir = std::env::temp_dir().join(format!("carteirinha-upload-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = UploadConfig::default();

        let gif = dir.join("photo.gif");
        std::fs::write(&gif, b"GIF89a\x01\x00\x01\x00").unwrap();
        let err = read_checked(&gif, &config).await.unwrap_err();
        assert_eq!(err.to_string(), "Only PNG and JPEG images are allowed");

        let png = dir.join("photo.png");
        std::fs::write(&png, PNG_MAGIC).unwrap();
        let file = read_checked(&png, &config).await.unwrap();
        assert_eq!(file.file_name, "photo.png");
        assert_eq!(file.bytes, PNG_MAGIC);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
    }
}
