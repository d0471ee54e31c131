// ABOUTME: TOML config store holding credentials and default backend/format settings
// ABOUTME: Resolves the config path from IMGUP_CONFIG, XDG config home, or ~/.config

use crate::constants::{defaults, env, paths, settings, REDACTED};
use anyhow::{anyhow, Context, Result};
use imgup_sdk::credentials::keys;
use imgup_sdk::{Backend, Credentials, OutputFormat};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Flat string mapping as stored on disk.
pub type ConfigMap = BTreeMap<String, String>;

/// Reads and writes the config file at one resolved path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at the standard location.
    pub fn locate() -> Result<Self> {
        Ok(Self {
            path: Self::default_path()?,
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `$IMGUP_CONFIG`, then `$XDG_CONFIG_HOME/imgup/config.toml`, then
    /// `~/.config/imgup/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(explicit) = std::env::var_os(paths::CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(explicit));
        }

        if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME").filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(config_home)
                .join(paths::CONFIG_DIR)
                .join(paths::CONFIG_FILE));
        }

        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home
            .join(".config")
            .join(paths::CONFIG_DIR)
            .join(paths::CONFIG_FILE))
    }

    /// Empty when the file does not exist yet.
    pub fn load(&self) -> Result<ConfigMap> {
        if !self.path.exists() {
            log::debug!("No config file at {}", self.path.display());
            return Ok(ConfigMap::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config file: {}", self.path.display()))?;
        let table: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", self.path.display()))?;

        // Non-string scalars are kept as their TOML rendering
        Ok(table
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    toml::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect())
    }

    pub fn save(&self, config: &ConfigMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = toml::to_string(config).context("Failed to serialize config")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))?;
        restrict_permissions(&self.path)?;
        Ok(())
    }

    /// Load, apply `update`, save.
    pub fn update(&self, update: impl FnOnce(&mut ConfigMap)) -> Result<ConfigMap> {
        let mut config = self.load()?;
        update(&mut config);
        self.save(&config)?;
        Ok(config)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

fn setting<'a>(config: &'a ConfigMap, key: &str, legacy: &str) -> Option<&'a str> {
    config
        .get(key)
        .or_else(|| config.get(legacy))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Configured default backend, else SmugMug.
pub fn default_backend(config: &ConfigMap) -> Result<Backend> {
    let name = setting(config, settings::DEFAULT_BACKEND, settings::LEGACY_BACKEND)
        .unwrap_or(defaults::BACKEND);
    name.parse()
        .with_context(|| format!("Invalid default backend in config: {name}"))
}

/// Configured default output format, else Markdown.
pub fn default_format(config: &ConfigMap) -> Result<OutputFormat> {
    let name = setting(config, settings::DEFAULT_FORMAT, settings::LEGACY_FORMAT)
        .unwrap_or(defaults::FORMAT);
    name.parse()
        .map_err(|e: String| anyhow!(e))
        .with_context(|| format!("Invalid default format in config: {name}"))
}

/// Writes both the current and the legacy key.
pub fn set_default_backend(config: &mut ConfigMap, backend: Backend) {
    for key in [settings::DEFAULT_BACKEND, settings::LEGACY_BACKEND] {
        config.insert(key.to_string(), backend.to_string());
    }
}

pub fn set_default_format(config: &mut ConfigMap, format: OutputFormat) {
    for key in [settings::DEFAULT_FORMAT, settings::LEGACY_FORMAT] {
        config.insert(key.to_string(), format.to_string());
    }
}

/// Overlay `FLICKR_KEY`/`FLICKR_SECRET` from the environment.
pub fn apply_env_overrides(config: &mut ConfigMap, lookup: impl Fn(&str) -> Option<String>) {
    for (var, key) in [
        (env::FLICKR_KEY, keys::FLICKR_KEY),
        (env::FLICKR_SECRET, keys::FLICKR_SECRET),
    ] {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            log::debug!("Using {var} from environment");
            config.insert(key.to_string(), value);
        }
    }
}

/// Credentials for the adapters, with environment overrides applied.
pub fn credentials(config: &ConfigMap) -> Credentials {
    let mut merged = config.clone();
    apply_env_overrides(&mut merged, |var| std::env::var(var).ok());
    Credentials::from_map(&merged)
}

/// Copy of `config` safe to print.
pub fn redacted(config: &ConfigMap) -> ConfigMap {
    config
        .iter()
        .map(|(key, value)| {
            let shown = if keys::SECRET_KEYS.contains(&key.as_str()) && !value.is_empty() {
                REDACTED.to_string()
            } else {
                value.clone()
            };
            (key.clone(), shown)
        })
        .collect()
}

/// Remove every key belonging to `backend`. Returns how many were removed.
pub fn clear_backend(config: &mut ConfigMap, backend: Backend) -> usize {
    let owned: &[&str] = match backend {
        Backend::SmugMug => &[
            keys::CONSUMER_KEY,
            keys::CONSUMER_SECRET,
            keys::ACCESS_TOKEN,
            keys::ACCESS_TOKEN_SECRET,
            keys::ALBUM_ID,
        ],
        Backend::Flickr => &[
            keys::FLICKR_KEY,
            keys::FLICKR_SECRET,
            keys::FLICKR_ACCESS_TOKEN,
            keys::FLICKR_ACCESS_TOKEN_SECRET,
        ],
        Backend::GoToSocial | Backend::Mastodon => &[],
    };

    let before = config.len();
    match backend.fediverse_flavor() {
        Some(flavor) => {
            let prefix = format!("{}_", flavor.prefix());
            config.retain(|key, _| !key.starts_with(&prefix));
        }
        None => config.retain(|key, _| !owned.contains(&key.as_str())),
    }
    before - config.len()
}
