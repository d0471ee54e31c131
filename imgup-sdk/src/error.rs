// ABOUTME: Error taxonomy for the imgup SDK with user-friendly messages
// ABOUTME: Separates fatal configuration problems from per-request protocol failures

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImgupError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown backend: {0:?}")]
    UnknownBackend(String),

    #[error("Too many images: {count} (max: {max})")]
    TooManyImages { count: usize, max: usize },

    #[error("No {backend} credentials configured")]
    MissingCredentials { backend: &'static str },

    #[error("No album_id in config")]
    MissingAlbum,

    #[error("Invalid resize spec {0:?}. Expected WxH, Wx or xH")]
    InvalidResize(String),

    #[error("{context} failed: HTTP {status}: {message}")]
    Protocol {
        context: &'static str,
        status: u16,
        message: String,
    },

    #[error("{context} response is missing {field}")]
    MissingField {
        context: &'static str,
        field: &'static str,
    },

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImgupError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ImgupError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn help_text(&self) -> Option<&'static str> {
        match self {
            ImgupError::MissingAlbum => Some("Run `imgup setup smugmug` to pick an album"),
            ImgupError::MissingCredentials { backend } => match *backend {
                "SmugMug" => Some("Run `imgup setup smugmug` first"),
                "Flickr" => Some("Run `imgup setup flickr` first"),
                _ => Some("Run `imgup setup gotosocial` or `imgup setup mastodon` first"),
            },
            ImgupError::UnknownBackend(_) => {
                Some("Supported backends: smugmug, flickr, gotosocial, mastodon")
            }
            ImgupError::TooManyImages { .. } => {
                Some("Split the images across several posts")
            }
            ImgupError::InvalidResize(_) => Some("Examples: 1920x1920, 1200x, x800"),
            ImgupError::Network(_) => Some("Check your internet connection and try again"),
            ImgupError::Authorization(_) => {
                Some("Check the app credentials and that your system clock is correct")
            }
            _ => None,
        }
    }

    /// Configuration errors are fatal before any request is made.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ImgupError::Configuration(_)
                | ImgupError::UnknownBackend(_)
                | ImgupError::TooManyImages { .. }
                | ImgupError::MissingCredentials { .. }
                | ImgupError::MissingAlbum
                | ImgupError::InvalidResize(_)
        )
    }
}

impl From<reqwest::Error> for ImgupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ImgupError::Network(format!("request timed out: {err}"))
        } else if err.is_decode() {
            ImgupError::InvalidResponse(err.to_string())
        } else {
            ImgupError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ImgupError {
    fn from(err: serde_json::Error) -> Self {
        ImgupError::InvalidResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImgupError>;
