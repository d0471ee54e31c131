// ABOUTME: Backend adapters and the Publisher trait they share
// ABOUTME: Holds the descriptor preparation and MIME helpers common to all backends

pub mod fediverse;
pub mod flickr;
pub mod smugmug;

pub use fediverse::{hashtags, FediverseClient, FediverseUploader};
pub use flickr::FlickrUploader;
pub use smugmug::SmugMugUploader;

use crate::error::{ImgupError, Result};
use crate::metadata;
use crate::options::UploadOptions;
use crate::types::{PublishedSnippet, ResolvedDescriptors};
use async_trait::async_trait;
use std::path::Path;

/// One configured upload, ready to run.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Human-readable backend name for progress output.
    fn name(&self) -> &'static str;

    /// Perform the upload. Either every step succeeds and a snippet with an
    /// absolute URL is returned, or an error is.
    async fn call(&self) -> Result<PublishedSnippet>;
}

/// Merge extracted metadata (when enabled) into the caller's descriptors and
/// apply the filename fallbacks.
pub fn prepare_descriptors(path: &Path, options: &UploadOptions) -> ResolvedDescriptors {
    let descriptors = if options.extract_metadata {
        options
            .descriptors
            .clone()
            .with_metadata(&metadata::extract(path))
    } else {
        options.descriptors.clone()
    };
    descriptors.resolve(path)
}

pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Multipart file part with the file's own name.
pub(crate) async fn file_part(path: &Path, mime: &str) -> Result<reqwest::multipart::Part> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ImgupError::io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    log::debug!("{} ({} bytes, {})", name, bytes.len(), mime);
    reqwest::multipart::Part::bytes(bytes)
        .file_name(name)
        .mime_str(mime)
        .map_err(|e| ImgupError::Configuration(format!("Invalid MIME type {mime}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{jpeg_with_segments, xmp_packet};
    use crate::types::UploadDescriptors;
    use tempfile::TempDir;

    #[test]
    fn test_mime_type_by_extension() {
        assert_eq!(mime_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type(Path::new("a.png")), "image/png");
        assert_eq!(mime_type(Path::new("a.gif")), "image/gif");
        assert_eq!(mime_type(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type(Path::new("a.heic")), "application/octet-stream");
        assert_eq!(mime_type(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_prepare_descriptors_uses_metadata_when_enabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shore.jpg");
        let xmp = xmp_packet(Some("Shoreline"), Some("Waves"), &["sea"]);
        std::fs::write(&path, jpeg_with_segments(None, Some(&xmp))).unwrap();

        let options = UploadOptions::builder()
            .descriptors(UploadDescriptors {
                tags: vec!["mine".to_string()],
                ..Default::default()
            })
            .build();
        let resolved = prepare_descriptors(&path, &options);
        assert_eq!(resolved.title, "Shoreline");
        assert_eq!(resolved.alt_text, "Waves");
        assert_eq!(resolved.caption, "Waves");
        assert_eq!(resolved.tags, vec!["mine", "sea"]);

        let options = UploadOptions::builder().extract_metadata(false).build();
        let resolved = prepare_descriptors(&path, &options);
        assert_eq!(resolved.title, "shore");
        assert_eq!(resolved.caption, "");
        assert!(resolved.tags.is_empty());
    }
}
