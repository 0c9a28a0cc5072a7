use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::GeotagError;

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "webp"];

/// Image formats whose GPS tags can be written in place.
///
/// Use [`ImageKind::from_path`] to detect the format from a file extension,
/// or [`ImageKind::from_bytes`] to sniff the actual content.
///
/// # Example
///
/// ```rust
/// use geotagger::intake::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("photo.JPG")), Some(ImageKind::Jpeg));
/// assert_eq!(ImageKind::from_path(Path::new("photo.webp")), Some(ImageKind::WebP));
/// assert_eq!(ImageKind::from_path(Path::new("photo.png")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// JPEG: EXIF APP1 segment replaced, all other segments kept verbatim
    Jpeg,
    /// WebP: EXIF chunk written via little_exif
    WebP,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Determine the image kind from the file's magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }
}

/// One uploaded image: its original file name and raw content.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an image from disk, keeping only its file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Path has no file name")?;
        Ok(Self { name, bytes })
    }

    /// The format as detected from content.
    pub fn kind(&self) -> Option<ImageKind> {
        ImageKind::from_bytes(&self.bytes)
    }
}

/// Reject a batch before any location work is done.
///
/// Fails on an empty batch, more than `max_files` uploads, or any upload
/// whose content is not JPEG or WebP.
pub fn validate_uploads(uploads: &[ImageUpload], max_files: usize) -> Result<(), GeotagError> {
    if uploads.is_empty() {
        return Err(GeotagError::Validation("No images were provided.".to_string()));
    }
    if uploads.len() > max_files {
        return Err(GeotagError::Validation(format!(
            "Please select only {max_files} files maximum ({} given).",
            uploads.len()
        )));
    }
    if let Some(bad) = uploads.iter().find(|u| u.kind().is_none()) {
        return Err(GeotagError::Validation(format!(
            "{} is not a JPEG or WebP image.",
            bad.name
        )));
    }
    Ok(())
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks) and their entries sorted so batches are
/// assigned in a stable order.
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0];
    const WEBP_MAGIC: &[u8] = b"RIFF\x24\x00\x00\x00WEBPVP8 ";

    fn jpeg(name: &str) -> ImageUpload {
        ImageUpload::new(name, JPEG_MAGIC.to_vec())
    }

    // ── ImageKind ─────────────────────────────────────────────────────

    #[test]
    fn image_kind_from_extension() {
        assert_eq!(ImageKind::from_path(Path::new("photo.jpg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("photo.jpeg")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("PHOTO.JPG")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("image.webp")), Some(ImageKind::WebP));
    }

    #[test]
    fn image_kind_unsupported() {
        assert_eq!(ImageKind::from_path(Path::new("image.png")), None);
        assert_eq!(ImageKind::from_path(Path::new("photo.heic")), None);
        assert_eq!(ImageKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn image_kind_from_content() {
        assert_eq!(ImageKind::from_bytes(JPEG_MAGIC), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_bytes(WEBP_MAGIC), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_bytes(b"\x89PNG\r\n\x1a\n"), None);
        assert_eq!(ImageKind::from_bytes(b"hello"), None);
    }

    // ── validate_uploads ──────────────────────────────────────────────

    #[test]
    fn validate_accepts_batch_at_limit() {
        let uploads: Vec<_> = (0..3).map(|i| jpeg(&format!("{i}.jpg"))).collect();
        assert!(validate_uploads(&uploads, 3).is_ok());
    }

    #[test]
    fn validate_rejects_batch_over_limit() {
        let uploads: Vec<_> = (0..4).map(|i| jpeg(&format!("{i}.jpg"))).collect();
        let err = validate_uploads(&uploads, 3).unwrap_err();
        assert!(matches!(err, GeotagError::Validation(_)));
        assert!(err.to_string().contains("3 files maximum"));
    }

    #[test]
    fn validate_rejects_empty_batch() {
        assert!(matches!(validate_uploads(&[], 25), Err(GeotagError::Validation(_))));
    }

    #[test]
    fn validate_rejects_non_image_content() {
        let uploads = vec![jpeg("a.jpg"), ImageUpload::new("notes.jpg", b"plain text".to_vec())];
        let err = validate_uploads(&uploads, 25).unwrap_err();
        assert!(err.to_string().contains("notes.jpg"));
    }

    // ── ImageUpload::from_path ────────────────────────────────────────

    #[test]
    fn upload_from_path_keeps_file_name_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("beach.jpg");
        fs::write(&path, JPEG_MAGIC).unwrap();

        let upload = ImageUpload::from_path(&path).unwrap();
        assert_eq!(upload.name, "beach.jpg");
        assert_eq!(upload.kind(), Some(ImageKind::Jpeg));
    }

    #[test]
    fn upload_from_missing_path_fails() {
        assert!(ImageUpload::from_path(Path::new("/nonexistent/beach.jpg")).is_err());
    }

    // ── collect_images ────────────────────────────────────────────────

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let images = collect_images(&[jpg.clone()]);
        assert_eq!(images, vec![jpg]);
    }

    #[test]
    fn collect_images_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("image.png");
        fs::write(&png, b"fake").unwrap();

        assert!(collect_images(&[png]).is_empty());
    }

    #[test]
    fn collect_images_directory_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("b.jpg"), b"fake").unwrap();
        fs::write(dir.path().join("a.webp"), b"fake").unwrap();
        fs::write(sub.join("c.jpeg"), b"fake").unwrap();
        fs::write(sub.join("d.txt"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.webp", "b.jpg", "c.jpeg"]);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        assert!(collect_images(&[PathBuf::from("/nonexistent/path")]).is_empty());
    }
}
