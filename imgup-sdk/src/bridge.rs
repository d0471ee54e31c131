// ABOUTME: Federation bridge republishing uploaded images as one fediverse status
// ABOUTME: Downloads each image, re-uploads it as media and posts with merged hashtags

use crate::backends::fediverse::{compose_status, FediverseClient};
use crate::constants::scratch::BRIDGE_PREFIX;
use crate::credentials::Credentials;
use crate::error::{ImgupError, Result};
use crate::http;
use crate::metadata::dedupe_tags;
use crate::options::BridgeOptions;
use crate::types::{FediverseMediaAttachment, PublishedSnippet};
use std::io::Write;
use tempfile::NamedTempFile;

pub struct FederationBridge {
    client: Option<FediverseClient>,
    http: reqwest::Client,
    options: BridgeOptions,
}

impl FederationBridge {
    /// A bridge without credentials for the requested flavor (or its
    /// alias) is valid but posts nothing.
    pub fn new(credentials: &Credentials, options: BridgeOptions) -> Result<Self> {
        let client = match credentials.fediverse(options.flavor) {
            Some(creds) => Some(FediverseClient::new(creds)?),
            None => {
                log::info!(
                    "{} not configured; run `imgup setup {}` to enable posting",
                    options.flavor.label(),
                    options.flavor.prefix()
                );
                None
            }
        };
        Ok(Self {
            client,
            http: http::client()?,
            options,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Post `results` as a single status. Returns the post URL, or `None` if
    /// the bridge is not configured or no image could be re-uploaded.
    pub async fn post(&self, results: &[PublishedSnippet]) -> Result<Option<String>> {
        let Some(client) = &self.client else {
            return Ok(None);
        };
        let Some(first) = results.first() else {
            return Ok(None);
        };

        log::info!(
            "Posting {} image(s) to {}",
            results.len(),
            client.flavor().label()
        );

        let mut media = Vec::with_capacity(results.len());
        for result in results {
            match self.transfer(client, result).await {
                Ok(attachment) => media.push(attachment),
                Err(e) => log::warn!("Skipping {}: {}", result.image_url, e),
            }
        }

        if media.is_empty() {
            log::warn!("No images could be transferred; no post made");
            return Ok(None);
        }

        tokio::time::sleep(self.options.processing_delay).await;

        let tags = dedupe_tags(results.iter().flat_map(|r| r.tags.iter()));
        let text = compose_status(
            self.options.post_text.as_deref().unwrap_or(&first.title),
            &tags,
        );

        let status = client
            .create_status(&text, &media, self.options.visibility)
            .await?;
        let url = status.post_url().ok_or(ImgupError::MissingField {
            context: "Post creation",
            field: "url",
        })?;
        log::info!("Posted to fediverse: {url}");
        Ok(Some(url.to_string()))
    }

    /// Download one result's image and upload it as media. The temp file is
    /// removed when this returns.
    async fn transfer(
        &self,
        client: &FediverseClient,
        result: &PublishedSnippet,
    ) -> Result<FediverseMediaAttachment> {
        let file = self.download(&result.image_url).await?;
        client
            .upload_media(file.path(), &media_description(result))
            .await
    }

    async fn download(&self, url: &str) -> Result<NamedTempFile> {
        log::debug!("Downloading {url}");
        let response = self.http.get(url).send().await?;
        let bytes = http::ensure_success(response, "Image download")
            .await?
            .bytes()
            .await?;

        let mut file = tempfile::Builder::new()
            .prefix(BRIDGE_PREFIX)
            .suffix(&url_extension(url))
            .tempfile()
            .map_err(|e| ImgupError::io(std::env::temp_dir(), e))?;
        file.write_all(&bytes)
            .map_err(|e| ImgupError::io(file.path(), e))?;
        file.flush().map_err(|e| ImgupError::io(file.path(), e))?;
        Ok(file)
    }
}

/// Alt text, then caption, then title; the first that is not blank.
pub fn media_description(result: &PublishedSnippet) -> String {
    [&result.alt_text, &result.caption, &result.title]
        .into_iter()
        .find(|s| !s.trim().is_empty())
        .cloned()
        .unwrap_or_default()
}

/// `.ext` of the URL's last path segment, or empty.
fn url_extension(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(String::from))
        })
        .and_then(|name| {
            std::path::Path::new(&name)
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
        })
        .unwrap_or_default()
}
