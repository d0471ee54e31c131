// ABOUTME: Core data types shared by the backends, factory and bridge
// ABOUTME: Upload descriptors, published results, post visibility and attachments

use crate::error::{ImgupError, Result};
use crate::metadata::{dedupe_tags, ImageMetadata};
use crate::snippet::Snippet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Caller- or metadata-supplied fields for a remote post. Unset fields fall
/// back per backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadDescriptors {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub alt_text: Option<String>,
    pub tags: Vec<String>,
}

impl UploadDescriptors {
    /// Fill unset fields from extracted metadata. Caller tags come first,
    /// extracted tags are appended.
    pub fn with_metadata(self, metadata: &ImageMetadata) -> Self {
        let tags = dedupe_tags(self.tags.iter().chain(metadata.tags.iter()));
        Self {
            title: non_empty(self.title).or_else(|| Some(metadata.title.clone())),
            caption: non_empty(self.caption).or_else(|| Some(metadata.caption.clone())),
            alt_text: non_empty(self.alt_text).or_else(|| Some(metadata.alt_text.clone())),
            tags,
        }
    }

    /// Apply the filename-based defaults used by the photo hosts.
    pub fn resolve(&self, path: &Path) -> ResolvedDescriptors {
        let title = non_empty(self.title.clone()).unwrap_or_else(|| file_stem(path));
        let alt_text = non_empty(self.alt_text.clone()).unwrap_or_else(|| title.clone());
        ResolvedDescriptors {
            caption: self.caption.clone().unwrap_or_default(),
            tags: dedupe_tags(&self.tags),
            title,
            alt_text,
        }
    }
}

/// Descriptors with every fallback applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDescriptors {
    pub title: String,
    pub caption: String,
    pub alt_text: String,
    pub tags: Vec<String>,
}

/// The result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedSnippet {
    /// Canonical image or post URL
    pub url: String,
    pub markdown: String,
    pub html: String,
    pub org: String,
    /// Direct image URL, downloadable by the federation bridge
    pub image_url: String,
    pub title: String,
    pub caption: String,
    pub alt_text: String,
    pub tags: Vec<String>,
}

impl PublishedSnippet {
    /// Result for an image hosted at `url`, referenced by its alt text.
    pub fn for_image(url: &str, descriptors: &ResolvedDescriptors) -> Result<Self> {
        let url = ensure_absolute_url(url)?;
        let snippet = Snippet::image(&url, &descriptors.alt_text);
        Ok(Self::assemble(url.clone(), url, snippet, descriptors))
    }

    /// Result for a post at `url` whose first attachment lives at `image_url`.
    pub fn for_post(
        url: &str,
        image_url: &str,
        label: &str,
        descriptors: &ResolvedDescriptors,
    ) -> Result<Self> {
        let url = ensure_absolute_url(url)?;
        let snippet = Snippet::link(&url, label);
        Ok(Self::assemble(url, image_url.to_string(), snippet, descriptors))
    }

    fn assemble(
        url: String,
        image_url: String,
        snippet: Snippet,
        descriptors: &ResolvedDescriptors,
    ) -> Self {
        Self {
            url,
            markdown: snippet.markdown,
            html: snippet.html,
            org: snippet.org,
            image_url,
            title: descriptors.title.clone(),
            caption: descriptors.caption.clone(),
            alt_text: descriptors.alt_text.clone(),
            tags: descriptors.tags.clone(),
        }
    }

    pub fn snippet(&self) -> Snippet {
        Snippet {
            markdown: self.markdown.clone(),
            html: self.html.clone(),
            org: self.org.clone(),
        }
    }
}

/// Fediverse status visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
    Direct,
}

impl FromStr for Visibility {
    type Err = ImgupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            "direct" => Ok(Visibility::Direct),
            other => Err(ImgupError::Configuration(format!(
                "Invalid visibility '{other}'. Must be one of: public, unlisted, private, direct"
            ))),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
            Visibility::Direct => "direct",
        };
        write!(f, "{name}")
    }
}

/// One image of a multi-image fediverse post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FediImage {
    pub path: PathBuf,
    pub description: Option<String>,
}

impl FediImage {
    pub fn new(path: impl Into<PathBuf>, description: Option<String>) -> Self {
        Self {
            path: path.into(),
            description,
        }
    }
}

/// A media attachment waiting for its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FediverseMediaAttachment {
    pub media_id: String,
    pub description: String,
}

/// Reject anything that is not an absolute http(s) URL.
pub fn ensure_absolute_url(url: &str) -> Result<String> {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Ok(url.to_string())
        }
        _ => Err(ImgupError::InvalidResponse(format!(
            "expected an absolute http(s) URL, got {url:?}"
        ))),
    }
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ImageMetadata {
        ImageMetadata {
            alt_text: "Meta alt".to_string(),
            title: "Meta title".to_string(),
            caption: "Meta alt".to_string(),
            tags: vec!["sea".to_string(), "sunset".to_string()],
        }
    }

    #[test]
    fn test_resolve_defaults_from_filename() {
        let resolved = UploadDescriptors::default().resolve(Path::new("/tmp/IMG_1.jpg"));
        assert_eq!(resolved.title, "IMG_1");
        assert_eq!(resolved.alt_text, "IMG_1");
        assert_eq!(resolved.caption, "");
        assert!(resolved.tags.is_empty());
    }

    #[test]
    fn test_resolve_prefers_alt_text() {
        let descriptors = UploadDescriptors {
            title: Some("Title".to_string()),
            alt_text: Some("Alt".to_string()),
            tags: vec![" a ".to_string(), "a".to_string(), "b".to_string()],
            ..Default::default()
        };
        let resolved = descriptors.resolve(Path::new("x.png"));
        assert_eq!(resolved.title, "Title");
        assert_eq!(resolved.alt_text, "Alt");
        assert_eq!(resolved.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_caller_descriptors_win_over_metadata() {
        let descriptors = UploadDescriptors {
            title: Some("Mine".to_string()),
            caption: Some("   ".to_string()),
            alt_text: None,
            tags: vec!["sunset".to_string(), "mine".to_string()],
        }
        .with_metadata(&metadata());

        assert_eq!(descriptors.title.as_deref(), Some("Mine"));
        assert_eq!(descriptors.caption.as_deref(), Some("Meta alt"));
        assert_eq!(descriptors.alt_text.as_deref(), Some("Meta alt"));
        assert_eq!(descriptors.tags, vec!["sunset", "mine", "sea"]);
    }

    #[test]
    fn test_published_snippet_for_image() {
        let resolved = UploadDescriptors {
            title: Some("T".to_string()),
            alt_text: Some("A".to_string()),
            ..Default::default()
        }
        .resolve(Path::new("x.jpg"));

        let result = PublishedSnippet::for_image("https://e.com/x.jpg", &resolved).unwrap();
        assert_eq!(result.url, "https://e.com/x.jpg");
        assert_eq!(result.image_url, result.url);
        assert_eq!(result.markdown, "![A](https://e.com/x.jpg)");
        assert_eq!(result.title, "T");
    }

    #[test]
    fn test_published_snippet_rejects_relative_url() {
        let resolved = UploadDescriptors::default().resolve(Path::new("x.jpg"));
        assert!(PublishedSnippet::for_image("/api/v2/image/x", &resolved).is_err());
        assert!(PublishedSnippet::for_image("", &resolved).is_err());
        assert!(PublishedSnippet::for_image("ftp://e.com/x.jpg", &resolved).is_err());
    }

    #[test]
    fn test_visibility_parse_and_serialize() {
        assert_eq!("Unlisted".parse::<Visibility>().unwrap(), Visibility::Unlisted);
        assert!("friends".parse::<Visibility>().is_err());
        assert_eq!(
            serde_json::to_string(&Visibility::Direct).unwrap(),
            "\"direct\""
        );
        assert_eq!(Visibility::default().to_string(), "public");
    }
}
