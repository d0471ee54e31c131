// ABOUTME: OAuth 1.0a HMAC-SHA1 request signing used by SmugMug and Flickr
// ABOUTME: Builds Authorization headers and performs the PIN token exchange

use crate::error::{ImgupError, Result};
use base64::prelude::*;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

type HmacSha1 = Hmac<Sha1>;

/// RFC 5849 section 3.6: everything but ALPHA / DIGIT / "-" / "." / "_" / "~"
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// A token/secret pair returned by an OAuth1 token endpoint.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub token: String,
    pub secret: SecretString,
}

#[derive(Debug, Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: SecretString,
    token: Option<TokenPair>,
}

impl OAuth1Signer {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: SecretString) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>, secret: SecretString) -> Self {
        self.token = Some(TokenPair {
            token: token.into(),
            secret,
        });
        self
    }

    /// Authorization header for a request. `params` are the form fields that
    /// take part in the signature (never multipart file parts).
    pub fn authorization_header(
        &self,
        method: &Method,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String> {
        self.authorization_header_with(method, url, params, &[], &generate_nonce(), now())
    }

    /// Like [`authorization_header`](Self::authorization_header), with extra
    /// protocol parameters (`oauth_callback`, `oauth_verifier`) and a fixed
    /// nonce and timestamp.
    pub fn authorization_header_with(
        &self,
        method: &Method,
        url: &str,
        params: &[(&str, &str)],
        extra_oauth: &[(&str, &str)],
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let timestamp = timestamp.to_string();
        let mut oauth_params: Vec<(&str, &str)> = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_version", "1.0"),
        ];
        if let Some(token) = &self.token {
            oauth_params.push(("oauth_token", token.token.as_str()));
        }
        oauth_params.extend_from_slice(extra_oauth);

        let base = signature_base_string(method, url, params, &oauth_params)?;
        let signature = self.sign(&base)?;

        let mut header_params: Vec<(String, String)> = oauth_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        header_params.push(("oauth_signature".to_string(), signature));
        header_params.sort();

        let fields = header_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {fields}"))
    }

    fn sign(&self, base: &str) -> Result<String> {
        let token_secret = self
            .token
            .as_ref()
            .map(|t| t.secret.expose_secret().to_string())
            .unwrap_or_default();
        let key = format!(
            "{}&{}",
            percent_encode(self.consumer_secret.expose_secret()),
            percent_encode(&token_secret)
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| ImgupError::Configuration(format!("Invalid OAuth signing key: {e}")))?;
        mac.update(base.as_bytes());
        Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Fetch a request token (first leg of the PIN flow).
    pub async fn request_token(&self, http: &reqwest::Client, url: &str) -> Result<TokenPair> {
        let header = self.authorization_header_with(
            &Method::GET,
            url,
            &[],
            &[("oauth_callback", crate::constants::urls::OAUTH1_OOB_CALLBACK)],
            &generate_nonce(),
            now(),
        )?;
        fetch_token(http, url, header, "Request token").await
    }

    /// Exchange an authorized request token and verifier for an access token.
    /// `self` must carry the request token.
    pub async fn access_token(
        &self,
        http: &reqwest::Client,
        url: &str,
        verifier: &str,
    ) -> Result<TokenPair> {
        let header = self.authorization_header_with(
            &Method::GET,
            url,
            &[],
            &[("oauth_verifier", verifier)],
            &generate_nonce(),
            now(),
        )?;
        fetch_token(http, url, header, "Access token").await
    }
}

async fn fetch_token(
    http: &reqwest::Client,
    url: &str,
    header: String,
    context: &'static str,
) -> Result<TokenPair> {
    let response = http
        .get(url)
        .header(reqwest::header::AUTHORIZATION, header)
        .send()
        .await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ImgupError::Protocol {
            context,
            status: status.as_u16(),
            message: body,
        });
    }
    parse_token_response(&body, context)
}

/// Parse an `oauth_token=...&oauth_token_secret=...` body.
pub fn parse_token_response(body: &str, context: &'static str) -> Result<TokenPair> {
    let mut token = None;
    let mut secret = None;
    for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(TokenPair {
        token: token.ok_or(ImgupError::MissingField {
            context,
            field: "oauth_token",
        })?,
        secret: SecretString::from(secret.ok_or(ImgupError::MissingField {
            context,
            field: "oauth_token_secret",
        })?),
    })
}

fn signature_base_string(
    method: &Method,
    url: &str,
    params: &[(&str, &str)],
    oauth_params: &[(&str, &str)],
) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|e| ImgupError::Configuration(format!("Invalid URL {url}: {e}")))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| ImgupError::Configuration(format!("URL has no host: {url}")))?
        .to_lowercase();
    let base_url = match parsed.port() {
        Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, parsed.path()),
        None => format!("{}://{}{}", parsed.scheme(), host, parsed.path()),
    };

    let mut encoded: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .chain(
            params
                .iter()
                .chain(oauth_params.iter())
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.as_str().to_uppercase(),
        percent_encode(&base_url),
        percent_encode(&param_string)
    ))
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
