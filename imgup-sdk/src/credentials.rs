// ABOUTME: Per-backend credential bundles built once from the config mapping
// ABOUTME: Secrets are held as SecretString and only exposed when signing requests

use crate::error::{ImgupError, Result};
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Config keys read by [`Credentials::from_map`].
pub mod keys {
    pub const CONSUMER_KEY: &str = "consumer_key";
    pub const CONSUMER_SECRET: &str = "consumer_secret";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const ACCESS_TOKEN_SECRET: &str = "access_token_secret";
    pub const ALBUM_ID: &str = "album_id";
    pub const FLICKR_KEY: &str = "flickr_key";
    pub const FLICKR_SECRET: &str = "flickr_secret";
    pub const FLICKR_ACCESS_TOKEN: &str = "flickr_access_token";
    pub const FLICKR_ACCESS_TOKEN_SECRET: &str = "flickr_access_token_secret";

    /// Keys that hold secrets and are redacted when displayed.
    pub const SECRET_KEYS: &[&str] = &[
        CONSUMER_SECRET,
        ACCESS_TOKEN,
        ACCESS_TOKEN_SECRET,
        FLICKR_SECRET,
        FLICKR_ACCESS_TOKEN,
        FLICKR_ACCESS_TOKEN_SECRET,
        "gotosocial_token",
        "gotosocial_client_secret",
        "mastodon_token",
    ];
}

/// Which fediverse server family a prefix of config keys belongs to. Both
/// speak the same Mastodon client API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FediverseFlavor {
    #[default]
    GoToSocial,
    Mastodon,
}

impl FediverseFlavor {
    pub fn prefix(&self) -> &'static str {
        match self {
            FediverseFlavor::GoToSocial => "gotosocial",
            FediverseFlavor::Mastodon => "mastodon",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FediverseFlavor::GoToSocial => "GoToSocial",
            FediverseFlavor::Mastodon => "Mastodon",
        }
    }

    pub fn instance_key(&self) -> String {
        format!("{}_instance", self.prefix())
    }

    pub fn token_key(&self) -> String {
        format!("{}_token", self.prefix())
    }

    fn other(&self) -> Self {
        match self {
            FediverseFlavor::GoToSocial => FediverseFlavor::Mastodon,
            FediverseFlavor::Mastodon => FediverseFlavor::GoToSocial,
        }
    }
}

impl FromStr for FediverseFlavor {
    type Err = ImgupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gotosocial" => Ok(FediverseFlavor::GoToSocial),
            "mastodon" => Ok(FediverseFlavor::Mastodon),
            _ => Err(ImgupError::UnknownBackend(s.to_string())),
        }
    }
}

impl fmt::Display for FediverseFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Debug, Clone)]
pub struct SmugMugCredentials {
    pub consumer_key: String,
    pub consumer_secret: SecretString,
    pub access_token: String,
    pub access_token_secret: SecretString,
    pub album_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FlickrCredentials {
    pub api_key: String,
    pub api_secret: SecretString,
    pub access_token: String,
    pub access_token_secret: SecretString,
}

#[derive(Debug, Clone)]
pub struct FediverseCredentials {
    pub flavor: FediverseFlavor,
    /// Instance base URL without a trailing slash
    pub instance_url: String,
    pub token: SecretString,
}

impl FediverseCredentials {
    pub fn new(
        flavor: FediverseFlavor,
        instance_url: impl Into<String>,
        token: SecretString,
    ) -> Self {
        Self {
            flavor,
            instance_url: normalize_instance(&instance_url.into()),
            token,
        }
    }
}

/// Everything the adapters need, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub smugmug: Option<SmugMugCredentials>,
    pub flickr: Option<FlickrCredentials>,
    pub gotosocial: Option<FediverseCredentials>,
    pub mastodon: Option<FediverseCredentials>,
}

impl Credentials {
    /// Build from the flat key/value config mapping. A backend is present
    /// only when all of its required keys are set and non-empty.
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let smugmug = (|| {
            Some(SmugMugCredentials {
                consumer_key: get(keys::CONSUMER_KEY)?,
                consumer_secret: SecretString::from(get(keys::CONSUMER_SECRET)?),
                access_token: get(keys::ACCESS_TOKEN)?,
                access_token_secret: SecretString::from(get(keys::ACCESS_TOKEN_SECRET)?),
                album_id: get(keys::ALBUM_ID),
            })
        })();

        let flickr = (|| {
            Some(FlickrCredentials {
                api_key: get(keys::FLICKR_KEY)?,
                api_secret: SecretString::from(get(keys::FLICKR_SECRET)?),
                access_token: get(keys::FLICKR_ACCESS_TOKEN)?,
                access_token_secret: SecretString::from(get(keys::FLICKR_ACCESS_TOKEN_SECRET)?),
            })
        })();

        let fediverse = |flavor: FediverseFlavor| {
            Some(FediverseCredentials::new(
                flavor,
                get(&flavor.instance_key())?,
                SecretString::from(get(&flavor.token_key())?),
            ))
        };

        log::debug!(
            "Credentials loaded: smugmug={}, flickr={}",
            smugmug.is_some(),
            flickr.is_some()
        );

        Self {
            smugmug,
            flickr,
            gotosocial: fediverse(FediverseFlavor::GoToSocial),
            mastodon: fediverse(FediverseFlavor::Mastodon),
        }
    }

    pub fn smugmug(&self) -> Result<&SmugMugCredentials> {
        self.smugmug
            .as_ref()
            .ok_or(ImgupError::MissingCredentials { backend: "SmugMug" })
    }

    pub fn flickr(&self) -> Result<&FlickrCredentials> {
        self.flickr
            .as_ref()
            .ok_or(ImgupError::MissingCredentials { backend: "Flickr" })
    }

    /// Fediverse credentials for `flavor`, falling back to the other prefix.
    pub fn fediverse(&self, flavor: FediverseFlavor) -> Option<&FediverseCredentials> {
        self.fediverse_exact(flavor)
            .or_else(|| self.fediverse_exact(flavor.other()))
    }

    pub fn require_fediverse(&self, flavor: FediverseFlavor) -> Result<&FediverseCredentials> {
        self.fediverse(flavor).ok_or(ImgupError::MissingCredentials {
            backend: flavor.label(),
        })
    }

    fn fediverse_exact(&self, flavor: FediverseFlavor) -> Option<&FediverseCredentials> {
        match flavor {
            FediverseFlavor::GoToSocial => self.gotosocial.as_ref(),
            FediverseFlavor::Mastodon => self.mastodon.as_ref(),
        }
    }
}

/// Add a scheme if missing and drop trailing slashes.
pub fn normalize_instance(instance: &str) -> String {
    let instance = instance.trim().trim_end_matches('/');
    if instance.starts_with("http://") || instance.starts_with("https://") {
        instance.to_string()
    } else {
        format!("https://{instance}")
    }
}
