//! Embedded image metadata extraction.
//!
//! Two independent sources feed the descriptors of an upload:
//!
//! - **EXIF** (`.jpg`/`.jpeg` only): ImageDescription, DocumentName/XPTitle,
//!   XPKeywords.
//! - **XMP** (any file containing an `x:xmpmeta` packet): Dublin Core title,
//!   description and subject.
//!
//! ## Resolution priority
//!
//! - **alt text**: EXIF description → first XMP description → filename stem
//! - **title**: EXIF document name (then XPTitle) → XMP title → filename stem
//! - **caption**: same value as alt text
//! - **tags**: EXIF keywords followed by XMP subjects, trimmed, empties
//!   dropped, duplicates removed keeping the first occurrence
//!
//! A source that is missing or fails to parse contributes nothing; extraction
//! itself never fails.

pub mod exif;
pub mod xmp;

use exif::ExifFields;
use serde::Serialize;
use std::path::Path;
use xmp::XmpFields;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub alt_text: String,
    pub title: String,
    pub caption: String,
    pub tags: Vec<String>,
}

pub struct MetadataExtractor {
    stem: String,
    exif: Option<ExifFields>,
    xmp: Option<XmpFields>,
}

impl MetadataExtractor {
    /// Read both metadata sources from the file at `path`.
    pub fn new(path: &Path) -> Self {
        let data = std::fs::read(path)
            .map_err(|e| log::debug!("Could not read {} for metadata: {}", path.display(), e))
            .ok();
        Self::from_bytes(path, data.as_deref())
    }

    /// Build from bytes already in memory. `path` supplies the extension and
    /// filename fallback.
    pub fn from_bytes(path: &Path, data: Option<&[u8]>) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let exif = data
            .filter(|_| is_jpeg_path(path))
            .and_then(exif::read_exif_from_jpeg);
        let xmp = data.and_then(xmp::read_xmp);

        log::debug!(
            "Metadata sources for {}: exif={}, xmp={}",
            path.display(),
            exif.is_some(),
            xmp.is_some()
        );

        Self { stem, exif, xmp }
    }

    pub fn extract(&self) -> ImageMetadata {
        let alt_text = self.alt_text();
        ImageMetadata {
            caption: alt_text.clone(),
            alt_text,
            title: self.title(),
            tags: self.tags(),
        }
    }

    fn alt_text(&self) -> String {
        let exif = self
            .exif
            .as_ref()
            .and_then(|e| e.image_description.clone());
        let xmp = || {
            self.xmp
                .as_ref()
                .and_then(|x| x.description.as_ref())
                .and_then(|d| d.first())
                .map(String::from)
        };
        exif.or_else(xmp).unwrap_or_else(|| self.stem.clone())
    }

    fn title(&self) -> String {
        let exif = self
            .exif
            .as_ref()
            .and_then(|e| e.document_name.clone().or_else(|| e.xp_title.clone()));
        let xmp = || {
            self.xmp
                .as_ref()
                .and_then(|x| x.title.as_ref())
                .and_then(|t| t.first())
                .map(String::from)
        };
        exif.or_else(xmp).unwrap_or_else(|| self.stem.clone())
    }

    fn tags(&self) -> Vec<String> {
        let exif = self
            .exif
            .as_ref()
            .map(ExifFields::keyword_list)
            .unwrap_or_default();
        let xmp = self
            .xmp
            .as_ref()
            .map(|x| x.subject.clone())
            .unwrap_or_default();

        dedupe_tags(exif.into_iter().chain(xmp))
    }
}

/// Shorthand for `MetadataExtractor::new(path).extract()`.
pub fn extract(path: &Path) -> ImageMetadata {
    MetadataExtractor::new(path).extract()
}

/// Trim, drop empties and remove exact duplicates keeping first-seen order.
pub fn dedupe_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false)
}
