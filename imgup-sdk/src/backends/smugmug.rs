// ABOUTME: SmugMug adapter: OAuth1-signed multipart upload into a configured album
// ABOUTME: Follows up with a sizes lookup to resolve the largest image URL

use super::{file_part, prepare_descriptors, Publisher};
use crate::constants::{scratch::UPLOAD_DIR, urls};
use crate::credentials::{Credentials, SmugMugCredentials};
use crate::error::{ImgupError, Result};
use crate::http;
use crate::oauth1::OAuth1Signer;
use crate::options::UploadOptions;
use crate::scratch::ScratchFile;
use crate::types::{PublishedSnippet, ResolvedDescriptors};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Named size fields tried in order when the sizes response has no list.
const NAMED_SIZE_FIELDS: &[&str] = &["XLargeImageUrl", "LargestImageUrl", "OriginalImageUrl"];

pub struct SmugMugUploader {
    path: PathBuf,
    descriptors: ResolvedDescriptors,
    credentials: SmugMugCredentials,
    album_id: String,
    http: reqwest::Client,
    upload_url: String,
    api_base: String,
    scratch_dir: PathBuf,
}

impl SmugMugUploader {
    /// Fails before any request if credentials or the album are missing.
    pub fn new(
        path: impl Into<PathBuf>,
        options: &UploadOptions,
        credentials: &Credentials,
    ) -> Result<Self> {
        let credentials = credentials.smugmug()?.clone();
        let album_id = credentials
            .album_id
            .clone()
            .ok_or(ImgupError::MissingAlbum)?;
        let path = path.into();
        let descriptors = prepare_descriptors(&path, options);

        Ok(Self {
            path,
            descriptors,
            credentials,
            album_id,
            http: http::client()?,
            upload_url: urls::SMUGMUG_UPLOAD.to_string(),
            api_base: urls::SMUGMUG_API_BASE.to_string(),
            scratch_dir: std::env::temp_dir().join(UPLOAD_DIR),
        })
    }

    pub fn with_endpoints(mut self, upload_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.upload_url = upload_url.into();
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn descriptors(&self) -> &ResolvedDescriptors {
        &self.descriptors
    }

    fn signer(&self) -> OAuth1Signer {
        OAuth1Signer::new(
            &self.credentials.consumer_key,
            self.credentials.consumer_secret.clone(),
        )
        .with_token(
            &self.credentials.access_token,
            self.credentials.access_token_secret.clone(),
        )
    }

    /// `X-Smug-*` upload headers. Keywords are omitted when there are no tags.
    fn upload_headers(&self, filename: &str) -> Result<HeaderMap> {
        let d = &self.descriptors;
        let mut fields = vec![
            ("x-smug-albumuri", format!("/api/v2/album/{}", self.album_id)),
            ("x-smug-responsetype", "JSON".to_string()),
            ("x-smug-version", "v2".to_string()),
            ("x-smug-filename", filename.to_string()),
            ("x-smug-title", d.title.clone()),
            ("x-smug-caption", d.caption.clone()),
        ];
        if !d.tags.is_empty() {
            fields.push(("x-smug-keywords", d.tags.join(",")));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in fields {
            headers.insert(HeaderName::from_static(name), header_value(&value)?);
        }
        Ok(headers)
    }

    /// Multipart upload of the scratch copy; returns the new image's URI.
    async fn upload(&self, file: &Path) -> Result<String> {
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let form = reqwest::multipart::Form::new()
            .part("file", file_part(file, "application/octet-stream").await?);
        let auth = self
            .signer()
            .authorization_header(&Method::POST, &self.upload_url, &[])?;

        log::info!("Uploading {} to SmugMug album {}", filename, self.album_id);
        let response = self
            .http
            .post(&self.upload_url)
            .headers(self.upload_headers(&filename)?)
            .header(AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await?;
        let body: Value = http::ensure_success(response, "SmugMug upload")
            .await?
            .json()
            .await?;

        let image = &body["Image"];
        image["ImageUri"]
            .as_str()
            .or_else(|| image["Uri"].as_str())
            .map(String::from)
            .ok_or(ImgupError::MissingField {
                context: "SmugMug upload",
                field: "ImageUri",
            })
    }

    async fn fetch_image_url(&self, image_uri: &str) -> Result<String> {
        let url = format!("{}{}!sizes", self.api_base, image_uri);
        let auth = self.signer().authorization_header(&Method::GET, &url, &[])?;

        log::debug!("Fetching sizes from {url}");
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let body: Value = http::ensure_success(response, "SmugMug size fetch")
            .await?
            .json()
            .await?;

        select_size_url(&body).ok_or(ImgupError::MissingField {
            context: "SmugMug size fetch",
            field: "image size URL",
        })
    }
}

#[async_trait]
impl Publisher for SmugMugUploader {
    fn name(&self) -> &'static str {
        "SmugMug"
    }

    async fn call(&self) -> Result<PublishedSnippet> {
        let image_uri = {
            let scratch = ScratchFile::copy_into(&self.path, &self.scratch_dir)?;
            self.upload(scratch.path()).await?
        };
        let url = self.fetch_image_url(&image_uri).await?;
        log::debug!("Resolved {image_uri} to {url}");
        PublishedSnippet::for_image(&url, &self.descriptors)
    }
}

/// Widest entry of `Response.ImageSizes.Size`, else the first named full-size
/// field that is set.
pub fn select_size_url(body: &Value) -> Option<String> {
    let sizes = &body["Response"]["ImageSizes"];

    if let Some(list) = sizes["Size"].as_array().filter(|l| !l.is_empty()) {
        return list
            .iter()
            .max_by_key(|size| width_of(&size["Width"]))
            .and_then(|size| size["Url"].as_str())
            .map(String::from);
    }

    NAMED_SIZE_FIELDS
        .iter()
        .find_map(|field| sizes[*field].as_str().filter(|s| !s.is_empty()))
        .map(String::from)
}

fn width_of(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .unwrap_or(0)
}

/// Header values allow any byte except controls; replace those with spaces.
fn header_value(value: &str) -> Result<HeaderValue> {
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    HeaderValue::from_bytes(cleaned.as_bytes())
        .map_err(|e| ImgupError::Configuration(format!("Invalid header value {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        smugmug_sizes_list_response, smugmug_sizes_named_response, smugmug_upload_response,
    };
    use crate::types::UploadDescriptors;
    use mockito::Matcher;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn credentials(album: bool) -> Credentials {
        let mut map: BTreeMap<String, String> = [
            ("consumer_key", "ck"),
            ("consumer_secret", "cs"),
            ("access_token", "at"),
            ("access_token_secret", "ats"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        if album {
            map.insert("album_id".to_string(), "abc123".to_string());
        }
        Credentials::from_map(&map)
    }

    fn options() -> UploadOptions {
        UploadOptions::builder()
            .descriptors(UploadDescriptors {
                title: Some("Sunset".to_string()),
                caption: Some("Over the bay".to_string()),
                alt_text: Some("Orange sky over water".to_string()),
                tags: vec!["sea".to_string(), "sky".to_string()],
            })
            .extract_metadata(false)
            .build()
    }

    fn source(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("sunset.jpg");
        std::fs::write(&path, b"jpeg bytes").unwrap();
        path
    }

    #[test]
    fn test_select_widest_size() {
        assert_eq!(
            select_size_url(&smugmug_sizes_list_response()).as_deref(),
            Some("https://photos.smugmug.com/O/a.jpg")
        );

        let two = json!({"Response": {"ImageSizes": {"Size": [
            {"Width": 100, "Url": "A"},
            {"Width": 4000, "Url": "B"}
        ]}}});
        assert_eq!(select_size_url(&two).as_deref(), Some("B"));
    }

    #[test]
    fn test_select_named_size_fallback() {
        assert_eq!(
            select_size_url(&smugmug_sizes_named_response()).as_deref(),
            Some("https://photos.smugmug.com/X3/a.jpg")
        );
        assert_eq!(select_size_url(&json!({"Response": {}})), None);
    }

    #[test]
    fn test_missing_album_is_configuration_error() {
        let err = SmugMugUploader::new("x.jpg", &options(), &credentials(false))
            .err()
            .unwrap();
        assert!(matches!(err, ImgupError::MissingAlbum));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_credentials() {
        let err = SmugMugUploader::new("x.jpg", &options(), &Credentials::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ImgupError::MissingCredentials { backend: "SmugMug" }
        ));
    }

    #[test]
    fn test_header_value_strips_controls_and_keeps_utf8() {
        assert_eq!(header_value("a\nb").unwrap(), "a b");
        assert!(header_value("Café").is_ok());
    }

    #[tokio::test]
    async fn test_upload_and_resolve_url() {
        let mut server = mockito::Server::new_async().await;
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("scratch");

        let upload = server
            .mock("POST", "/")
            .match_header("x-smug-albumuri", "/api/v2/album/abc123")
            .match_header("x-smug-responsetype", "JSON")
            .match_header("x-smug-version", "v2")
            .match_header("x-smug-filename", "sunset.jpg")
            .match_header("x-smug-title", "Sunset")
            .match_header("x-smug-caption", "Over the bay")
            .match_header("x-smug-keywords", "sea,sky")
            .match_header("authorization", Matcher::Regex(r"^OAuth .*oauth_token=.at.".to_string()))
            .with_status(200)
            .with_body(smugmug_upload_response("/api/v2/image/xyz-0").to_string())
            .create_async()
            .await;
        let sizes = server
            .mock("GET", "/api/v2/image/xyz-0!sizes")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body(smugmug_sizes_list_response().to_string())
            .create_async()
            .await;

        let uploader = SmugMugUploader::new(source(&dir), &options(), &credentials(true))
            .unwrap()
            .with_endpoints(format!("{}/", server.url()), server.url())
            .with_scratch_dir(&scratch);
        let result = uploader.call().await.unwrap();

        upload.assert_async().await;
        sizes.assert_async().await;
        assert_eq!(result.url, "https://photos.smugmug.com/O/a.jpg");
        assert_eq!(
            result.markdown,
            "![Orange sky over water](https://photos.smugmug.com/O/a.jpg)"
        );
        assert_eq!(result.tags, vec!["sea", "sky"]);
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_keywords_header_omitted_without_tags() {
        let mut server = mockito::Server::new_async().await;
        let dir = TempDir::new().unwrap();

        let upload = server
            .mock("POST", "/")
            .match_header("x-smug-keywords", Matcher::Missing)
            .with_body(smugmug_upload_response("/api/v2/image/xyz-0").to_string())
            .create_async()
            .await;
        let _sizes = server
            .mock("GET", "/api/v2/image/xyz-0!sizes")
            .with_body(smugmug_sizes_named_response().to_string())
            .create_async()
            .await;

        let options = UploadOptions::builder().extract_metadata(false).build();
        let uploader = SmugMugUploader::new(source(&dir), &options, &credentials(true))
            .unwrap()
            .with_endpoints(format!("{}/", server.url()), server.url())
            .with_scratch_dir(dir.path().join("scratch"));

        let result = uploader.call().await.unwrap();
        upload.assert_async().await;
        assert_eq!(result.url, "https://photos.smugmug.com/X3/a.jpg");
        assert_eq!(result.alt_text, "sunset");
    }

    #[tokio::test]
    async fn test_upload_failure_cleans_scratch_and_reports_status() {
        let mut server = mockito::Server::new_async().await;
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("scratch");

        let _upload = server
            .mock("POST", "/")
            .with_status(401)
            .with_body(r#"{"Code":401,"Message":"oauth_problem=signature_invalid"}"#)
            .create_async()
            .await;

        let uploader = SmugMugUploader::new(source(&dir), &options(), &credentials(true))
            .unwrap()
            .with_endpoints(format!("{}/", server.url()), server.url())
            .with_scratch_dir(&scratch);

        match uploader.call().await {
            Err(ImgupError::Protocol {
                status, message, ..
            }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "oauth_problem=signature_invalid");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_image_uri_is_error() {
        let mut server = mockito::Server::new_async().await;
        let dir = TempDir::new().unwrap();

        let _upload = server
            .mock("POST", "/")
            .with_body(r#"{"stat":"ok","Image":{}}"#)
            .create_async()
            .await;

        let uploader = SmugMugUploader::new(source(&dir), &options(), &credentials(true))
            .unwrap()
            .with_endpoints(format!("{}/", server.url()), server.url())
            .with_scratch_dir(dir.path().join("scratch"));

        assert!(matches!(
            uploader.call().await,
            Err(ImgupError::MissingField {
                field: "ImageUri",
                ..
            })
        ));
    }
}
