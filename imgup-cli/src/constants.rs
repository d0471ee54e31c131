// ABOUTME: Centralized constants for the imgup CLI application
// ABOUTME: Config file locations, environment variable names and command defaults

/// Config file locations
pub mod paths {
    /// Overrides every other config location when set
    pub const CONFIG_ENV: &str = "IMGUP_CONFIG";

    /// Directory under the XDG config home
    pub const CONFIG_DIR: &str = "imgup";

    pub const CONFIG_FILE: &str = "config.toml";

    /// Dotenv files loaded at startup, in order
    pub const LOCAL_ENV_FILE: &str = ".env";
    pub const HOME_ENV_FILE: &str = ".imgup.env";
}

/// Environment variables that override stored credentials
pub mod env {
    pub const FLICKR_KEY: &str = "FLICKR_KEY";
    pub const FLICKR_SECRET: &str = "FLICKR_SECRET";
}

/// Config keys that are not credentials
pub mod settings {
    pub const DEFAULT_BACKEND: &str = "default_backend";
    pub const DEFAULT_FORMAT: &str = "default_format";

    /// Older config files store these instead
    pub const LEGACY_BACKEND: &str = "backend";
    pub const LEGACY_FORMAT: &str = "format";
}

/// Fallbacks used when nothing is configured
pub mod defaults {
    pub const BACKEND: &str = "smugmug";
    pub const FORMAT: &str = "md";
}

/// Shown instead of secret config values
pub const REDACTED: &str = "********";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        assert!(defaults::BACKEND.parse::<imgup_sdk::Backend>().is_ok());
        assert!(defaults::FORMAT.parse::<imgup_sdk::OutputFormat>().is_ok());
    }

    #[test]
    fn test_settings_keys_are_distinct() {
        assert_ne!(settings::DEFAULT_BACKEND, settings::LEGACY_BACKEND);
        assert_ne!(settings::DEFAULT_FORMAT, settings::LEGACY_FORMAT);
    }
}
