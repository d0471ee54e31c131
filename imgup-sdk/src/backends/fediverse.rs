// ABOUTME: Fediverse adapter for GoToSocial and Mastodon multi-image posts
// ABOUTME: Uploads media with bearer auth, waits for processing, then creates the status

use super::{file_part, mime_type, Publisher};
use crate::constants::{limits::MAX_FEDI_IMAGES, urls};
use crate::credentials::{Credentials, FediverseCredentials, FediverseFlavor};
use crate::error::{ImgupError, Result};
use crate::http;
use crate::metadata::{self, dedupe_tags};
use crate::options::UploadOptions;
use crate::resize::{ImageResizer, ResizeSpec, Resizer};
use crate::scratch::ScratchFile;
use crate::types::{
    file_stem, FediImage, FediverseMediaAttachment, PublishedSnippet, ResolvedDescriptors,
    Visibility,
};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct MediaResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    status: &'a str,
    media_ids: Vec<&'a str>,
    visibility: Visibility,
}

/// The parts of a created status the caller uses.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedStatus {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub media_attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl CreatedStatus {
    /// Web URL of the post, falling back to its ActivityPub URI.
    pub fn post_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .or(self.uri.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// The account a token belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub username: String,
    #[serde(default)]
    pub acct: Option<String>,
}

/// Bearer-token client for the Mastodon-compatible media and status APIs.
#[derive(Clone)]
pub struct FediverseClient {
    http: reqwest::Client,
    credentials: FediverseCredentials,
}

impl FediverseClient {
    pub fn new(credentials: &FediverseCredentials) -> Result<Self> {
        Ok(Self {
            http: http::client()?,
            credentials: credentials.clone(),
        })
    }

    pub fn flavor(&self) -> FediverseFlavor {
        self.credentials.flavor
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.credentials.instance_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.credentials.token.expose_secret())
    }

    /// Check the token against the instance.
    pub async fn verify_credentials(&self) -> Result<Account> {
        let response = self
            .http
            .get(self.endpoint(urls::FEDI_VERIFY_CREDENTIALS_PATH))
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .send()
            .await?;
        Ok(http::ensure_success(response, "Credential check")
            .await?
            .json()
            .await?)
    }

    /// Upload one image as a media attachment.
    pub async fn upload_media(
        &self,
        path: &Path,
        description: &str,
    ) -> Result<FediverseMediaAttachment> {
        let form = reqwest::multipart::Form::new()
            .part("file", file_part(path, mime_type(path)).await?)
            .text("description", description.to_string());

        let response = self
            .http
            .post(self.endpoint(urls::FEDI_MEDIA_PATH))
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .multipart(form)
            .send()
            .await?;
        let media: MediaResponse = http::ensure_success(response, "Media upload")
            .await?
            .json()
            .await?;

        log::debug!(
            "Media {} uploaded{}",
            media.id,
            media.url.as_deref().map(|u| format!(" at {u}")).unwrap_or_default()
        );
        Ok(FediverseMediaAttachment {
            media_id: media.id,
            description: description.to_string(),
        })
    }

    /// Create a status with the given attachments, in order.
    pub async fn create_status(
        &self,
        text: &str,
        media: &[FediverseMediaAttachment],
        visibility: Visibility,
    ) -> Result<CreatedStatus> {
        let body = StatusRequest {
            status: text,
            media_ids: media.iter().map(|m| m.media_id.as_str()).collect(),
            visibility,
        };

        let response = self
            .http
            .post(self.endpoint(urls::FEDI_STATUSES_PATH))
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;
        let status: CreatedStatus = http::ensure_success(response, "Post creation")
            .await?
            .json()
            .await?;

        for attachment in &status.media_attachments {
            log::debug!(
                "Attachment {}: {}",
                attachment.id,
                attachment.url.as_deref().unwrap_or("-")
            );
        }
        Ok(status)
    }
}

/// Multi-image post to a GoToSocial or Mastodon instance.
pub struct FediverseUploader {
    client: FediverseClient,
    /// The backend asked for, which may differ from the credentials found
    flavor: FediverseFlavor,
    images: Vec<FediImage>,
    status_text: String,
    descriptors: ResolvedDescriptors,
    visibility: Visibility,
    resize: Option<ResizeSpec>,
    resizer: Box<dyn Resizer>,
    processing_delay: Duration,
}

impl FediverseUploader {
    /// `path` is used when `options.fediverse.images` is empty. The image
    /// limit is checked before credentials or any file is touched.
    pub fn new(
        path: Option<PathBuf>,
        options: &UploadOptions,
        credentials: &Credentials,
        flavor: FediverseFlavor,
    ) -> Result<Self> {
        let fedi = &options.fediverse;
        let mut images = if fedi.images.is_empty() {
            path.map(|p| vec![FediImage::new(p, options.descriptors.alt_text.clone())])
                .unwrap_or_default()
        } else {
            fedi.images.clone()
        };

        if images.len() > MAX_FEDI_IMAGES {
            return Err(ImgupError::TooManyImages {
                count: images.len(),
                max: MAX_FEDI_IMAGES,
            });
        }
        if images.is_empty() {
            return Err(ImgupError::Configuration("No images to post".to_string()));
        }

        let client = FediverseClient::new(credentials.require_fediverse(flavor)?)?;

        let mut tags = options.descriptors.tags.clone();
        for image in &mut images {
            if options.extract_metadata {
                let meta = metadata::extract(&image.path);
                if image.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
                    image.description = Some(meta.alt_text);
                }
                tags.extend(meta.tags);
            }
        }
        let tags = dedupe_tags(&tags);

        let first_description = images[0].description.clone().unwrap_or_default();
        let status_text = compose_status(
            fedi.post_text.as_deref().unwrap_or(&first_description),
            &tags,
        );

        let descriptors = ResolvedDescriptors {
            title: options
                .descriptors
                .title
                .clone()
                .unwrap_or_else(|| file_stem(&images[0].path)),
            caption: status_text.clone(),
            alt_text: first_description,
            tags,
        };

        Ok(Self {
            client,
            flavor,
            images,
            status_text,
            descriptors,
            visibility: fedi.visibility,
            resize: fedi.resize,
            resizer: Box::new(ImageResizer::default()),
            processing_delay: fedi.processing_delay,
        })
    }

    pub fn with_resizer(mut self, resizer: Box<dyn Resizer>) -> Self {
        self.resizer = resizer;
        self
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Resized scratch copy when a bound applies, else the original.
    fn upload_source(&self, path: &Path) -> (PathBuf, Option<ScratchFile>) {
        let Some(spec) = self.resize else {
            return (path.to_path_buf(), None);
        };
        match self.resizer.resize(path, spec) {
            Ok(resized) if resized != path => (resized.clone(), Some(ScratchFile::adopt(resized))),
            Ok(_) => (path.to_path_buf(), None),
            Err(e) => {
                log::warn!("Resize of {} failed, uploading original: {}", path.display(), e);
                (path.to_path_buf(), None)
            }
        }
    }
}

#[async_trait]
impl Publisher for FediverseUploader {
    fn name(&self) -> &'static str {
        self.flavor.label()
    }

    async fn call(&self) -> Result<PublishedSnippet> {
        log::info!(
            "Uploading {} image(s) to {}",
            self.images.len(),
            self.flavor.label()
        );

        let mut media = Vec::with_capacity(self.images.len());
        for image in &self.images {
            let (source, _guard) = self.upload_source(&image.path);
            let description = image.description.clone().unwrap_or_default();
            media.push(self.client.upload_media(&source, &description).await?);
        }

        log::info!("Waiting {:?} for media processing", self.processing_delay);
        tokio::time::sleep(self.processing_delay).await;

        let status = self
            .client
            .create_status(&self.status_text, &media, self.visibility)
            .await?;
        post_snippet(&status, self.flavor, &self.descriptors)
    }
}

/// Link snippet for a created status.
pub fn post_snippet(
    status: &CreatedStatus,
    flavor: FediverseFlavor,
    descriptors: &ResolvedDescriptors,
) -> Result<PublishedSnippet> {
    let url = status.post_url().ok_or(ImgupError::MissingField {
        context: "Post creation",
        field: "url",
    })?;
    let image_url = status
        .media_attachments
        .first()
        .and_then(|a| a.url.as_deref())
        .unwrap_or(url);
    PublishedSnippet::for_post(
        url,
        image_url,
        &format!("View post on {}", flavor.label()),
        descriptors,
    )
}

/// `#`-prefixed tags with everything but ASCII letters and digits removed.
/// Duplicates after sanitizing are dropped case-insensitively, keeping the
/// first spelling.
pub fn hashtags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| {
            t.as_ref()
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
        })
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(|t| format!("#{t}"))
        .collect()
}

/// Status text followed by a blank line and the hashtags.
pub fn compose_status<S: AsRef<str>>(text: &str, tags: &[S]) -> String {
    let tags = hashtags(tags);
    match (text.trim().is_empty(), tags.is_empty()) {
        (_, true) => text.to_string(),
        (true, false) => tags.join(" "),
        (false, false) => format!("{}\n\n{}", text, tags.join(" ")),
    }
}
