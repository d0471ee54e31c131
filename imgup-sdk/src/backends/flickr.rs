// ABOUTME: Flickr adapter: OAuth1-signed photo upload followed by a getInfo lookup
// ABOUTME: Builds the large ("_b") static image URL from the photo's server and secret

use super::{file_part, mime_type, prepare_descriptors, Publisher};
use crate::constants::urls;
use crate::credentials::{Credentials, FlickrCredentials};
use crate::error::{ImgupError, Result};
use crate::http;
use crate::oauth1::OAuth1Signer;
use crate::options::UploadOptions;
use crate::types::{PublishedSnippet, ResolvedDescriptors};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::LazyLock;

static PHOTO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<photoid[^>]*>\s*([^<\s]+)\s*</photoid>").expect("valid photoid regex")
});

static ERR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<err\b[^>]*\bcode="(\d+)"[^>]*\bmsg="([^"]*)""#).expect("valid err regex")
});

#[derive(Debug, Deserialize)]
struct InfoResponse {
    stat: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    photo: Option<PhotoInfo>,
}

#[derive(Debug, Deserialize)]
struct PhotoInfo {
    id: String,
    secret: String,
    server: String,
}

pub struct FlickrUploader {
    path: PathBuf,
    descriptors: ResolvedDescriptors,
    credentials: FlickrCredentials,
    http: reqwest::Client,
    upload_url: String,
    rest_url: String,
    static_base: String,
}

impl FlickrUploader {
    pub fn new(
        path: impl Into<PathBuf>,
        options: &UploadOptions,
        credentials: &Credentials,
    ) -> Result<Self> {
        let credentials = credentials.flickr()?.clone();
        let path = path.into();
        let descriptors = prepare_descriptors(&path, options);

        Ok(Self {
            path,
            descriptors,
            credentials,
            http: http::client()?,
            upload_url: urls::FLICKR_UPLOAD.to_string(),
            rest_url: urls::FLICKR_REST.to_string(),
            static_base: urls::FLICKR_STATIC.to_string(),
        })
    }

    pub fn with_endpoints(
        mut self,
        upload_url: impl Into<String>,
        rest_url: impl Into<String>,
        static_base: impl Into<String>,
    ) -> Self {
        self.upload_url = upload_url.into();
        self.rest_url = rest_url.into();
        self.static_base = static_base.into().trim_end_matches('/').to_string();
        self
    }

    fn signer(&self) -> OAuth1Signer {
        OAuth1Signer::new(&self.credentials.api_key, self.credentials.api_secret.clone())
            .with_token(
                &self.credentials.access_token,
                self.credentials.access_token_secret.clone(),
            )
    }

    async fn upload(&self) -> Result<String> {
        let d = &self.descriptors;
        let tags = flickr_tags(&d.tags);
        let fields = [
            ("title", d.title.as_str()),
            ("description", d.caption.as_str()),
            ("tags", tags.as_str()),
        ];

        let auth = self
            .signer()
            .authorization_header(&Method::POST, &self.upload_url, &fields)?;

        let mut form = reqwest::multipart::Form::new();
        for (name, value) in fields {
            form = form.text(name, value.to_string());
        }
        form = form.part("photo", file_part(&self.path, mime_type(&self.path)).await?);

        log::info!("Uploading {} to Flickr", self.path.display());
        let response = self
            .http
            .post(&self.upload_url)
            .header(AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = http::ensure_success(response, "Flickr upload")
            .await?
            .text()
            .await?;

        parse_upload_response(&body, status)
    }

    async fn photo_info(&self, photo_id: &str) -> Result<PhotoInfo> {
        let mut url = url::Url::parse(&self.rest_url)
            .map_err(|e| ImgupError::Configuration(format!("Invalid Flickr REST URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("method", "flickr.photos.getInfo")
            .append_pair("photo_id", photo_id)
            .append_pair("format", "json")
            .append_pair("nojsoncallback", "1");

        let auth = self
            .signer()
            .authorization_header(&Method::GET, url.as_str(), &[])?;
        let response = self
            .http
            .get(url.as_str())
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let status = response.status().as_u16();
        let info: InfoResponse = http::ensure_success(response, "Flickr getInfo")
            .await?
            .json()
            .await?;

        if info.stat != "ok" {
            return Err(ImgupError::Protocol {
                context: "Flickr getInfo",
                status,
                message: match (info.code, info.message) {
                    (Some(code), Some(msg)) => format!("{msg} (code {code})"),
                    (_, Some(msg)) => msg,
                    _ => format!("stat={}", info.stat),
                },
            });
        }
        info.photo.ok_or(ImgupError::MissingField {
            context: "Flickr getInfo",
            field: "photo",
        })
    }

    fn large_url(&self, photo: &PhotoInfo) -> String {
        format!(
            "{}/{}/{}_{}_b.jpg",
            self.static_base, photo.server, photo.id, photo.secret
        )
    }
}

#[async_trait]
impl Publisher for FlickrUploader {
    fn name(&self) -> &'static str {
        "Flickr"
    }

    async fn call(&self) -> Result<PublishedSnippet> {
        let photo_id = self.upload().await?;
        log::debug!("Flickr photo id {photo_id}");
        let info = self.photo_info(&photo_id).await?;
        PublishedSnippet::for_image(&self.large_url(&info), &self.descriptors)
    }
}

/// Space separated, with multi-word tags quoted.
pub fn flickr_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| t.replace('"', ""))
        .filter(|t| !t.trim().is_empty())
        .map(|t| {
            if t.contains(char::is_whitespace) {
                format!("\"{t}\"")
            } else {
                t
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_upload_response(body: &str, status: u16) -> Result<String> {
    if let Some(caps) = PHOTO_ID.captures(body) {
        return Ok(caps[1].to_string());
    }
    match ERR.captures(body) {
        Some(caps) => Err(ImgupError::Protocol {
            context: "Flickr upload",
            status,
            message: format!("{} (code {})", &caps[2], &caps[1]),
        }),
        None => Err(ImgupError::MissingField {
            context: "Flickr upload",
            field: "photoid",
        }),
    }
}
