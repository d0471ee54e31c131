// ABOUTME: Uploader factory mapping backend names to Publisher implementations
// ABOUTME: Unknown backend names are configuration errors, never a silent default

use crate::backends::{FediverseUploader, FlickrUploader, Publisher, SmugMugUploader};
use crate::credentials::{Credentials, FediverseFlavor};
use crate::error::{ImgupError, Result};
use crate::options::UploadOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    SmugMug,
    Flickr,
    GoToSocial,
    Mastodon,
}

impl Backend {
    pub const ALL: [Backend; 4] = [
        Backend::SmugMug,
        Backend::Flickr,
        Backend::GoToSocial,
        Backend::Mastodon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::SmugMug => "smugmug",
            Backend::Flickr => "flickr",
            Backend::GoToSocial => "gotosocial",
            Backend::Mastodon => "mastodon",
        }
    }

    pub fn fediverse_flavor(&self) -> Option<FediverseFlavor> {
        match self {
            Backend::GoToSocial => Some(FediverseFlavor::GoToSocial),
            Backend::Mastodon => Some(FediverseFlavor::Mastodon),
            _ => None,
        }
    }

    /// Fediverse backends take every image in one post; the photo hosts take
    /// one image per upload.
    pub fn is_fediverse(&self) -> bool {
        self.fediverse_flavor().is_some()
    }
}

impl FromStr for Backend {
    type Err = ImgupError;

    fn from_str(s: &str) -> Result<Self> {
        Backend::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ImgupError::UnknownBackend(s.to_string()))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the adapter for `backend`. `path` may be `None` only for fediverse
/// backends given images through `options.fediverse.images`.
pub fn build(
    backend: Backend,
    path: Option<&Path>,
    options: &UploadOptions,
    credentials: &Credentials,
) -> Result<Box<dyn Publisher>> {
    let require_path = || {
        path.ok_or_else(|| {
            ImgupError::Configuration(format!("{backend} uploads need an image path"))
        })
    };

    log::debug!("Building {backend} uploader");
    Ok(match backend {
        Backend::SmugMug => Box::new(SmugMugUploader::new(
            require_path()?,
            options,
            credentials,
        )?),
        Backend::Flickr => Box::new(FlickrUploader::new(require_path()?, options, credentials)?),
        Backend::GoToSocial | Backend::Mastodon => Box::new(FediverseUploader::new(
            path.map(Path::to_path_buf),
            options,
            credentials,
            backend
                .fediverse_flavor()
                .unwrap_or(FediverseFlavor::GoToSocial),
        )?),
    })
}

/// [`build`] from a backend name.
pub fn build_named(
    backend: &str,
    path: Option<&Path>,
    options: &UploadOptions,
    credentials: &Credentials,
) -> Result<Box<dyn Publisher>> {
    build(backend.parse()?, path, options, credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn creds() -> Credentials {
        let map: BTreeMap<String, String> = [
            ("consumer_key", "k"),
            ("consumer_secret", "s"),
            ("access_token", "t"),
            ("access_token_secret", "ts"),
            ("album_id", "a"),
            ("flickr_key", "k"),
            ("flickr_secret", "s"),
            ("flickr_access_token", "t"),
            ("flickr_access_token_secret", "ts"),
            ("gotosocial_instance", "https://gts.example"),
            ("gotosocial_token", "t"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Credentials::from_map(&map)
    }

    fn no_metadata() -> UploadOptions {
        UploadOptions::builder().extract_metadata(false).build()
    }

    #[test]
    fn test_backend_parse_is_case_insensitive() {
        assert_eq!("SmugMug".parse::<Backend>().unwrap(), Backend::SmugMug);
        assert_eq!("FLICKR".parse::<Backend>().unwrap(), Backend::Flickr);
        assert_eq!(" gotosocial ".parse::<Backend>().unwrap(), Backend::GoToSocial);
        assert_eq!("Mastodon".parse::<Backend>().unwrap(), Backend::Mastodon);
    }

    #[test]
    fn test_unknown_backend_is_error() {
        match "imgur".parse::<Backend>() {
            Err(ImgupError::UnknownBackend(name)) => assert_eq!(name, "imgur"),
            other => panic!("expected unknown backend, got {other:?}"),
        }
        assert!(build_named("", Some(Path::new("a.jpg")), &no_metadata(), &creds()).is_err());
    }

    #[test]
    fn test_build_returns_matching_publisher() {
        let path = Path::new("a.jpg");
        for (name, expected) in [
            ("smugmug", "SmugMug"),
            ("flickr", "Flickr"),
            ("gotosocial", "GoToSocial"),
            ("mastodon", "Mastodon"),
        ] {
            let publisher = build_named(name, Some(path), &no_metadata(), &creds()).unwrap();
            assert_eq!(publisher.name(), expected, "backend {name}");
        }
    }

    #[test]
    fn test_photo_hosts_require_path() {
        let err = build(Backend::Flickr, None, &no_metadata(), &creds())
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_backend_serde_names() {
        assert_eq!(
            serde_json::to_string(&Backend::GoToSocial).unwrap(),
            "\"gotosocial\""
        );
        assert!(Backend::Mastodon.is_fediverse());
        assert!(!Backend::SmugMug.is_fediverse());
    }
}
