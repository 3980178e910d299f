use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::setlist::{DEFAULT_BASE_URL, DEFAULT_MAX_PAGES};

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the file itself is optional.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// setlist.fm API settings.
    pub setlistfm: SetlistFmConfig,
}

/// setlist.fm API configuration.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SetlistFmConfig {
    /// API key sent as `x-api-key`. Usually supplied via `SETLISTFM_API_KEY` instead.
    pub api_key: Option<String>,
    /// REST API root.
    pub base_url: String,
    /// Artist whose concerts are counted (exact setlist.fm name).
    pub artist: String,
    /// Stop paginating after this many pages.
    pub max_pages: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Delay between page requests in milliseconds.
    pub rate_limit_ms: u64,
}

impl Default for SetlistFmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            artist: crate::DEFAULT_ARTIST.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            timeout_secs: 30,
            rate_limit_ms: 500,
        }
    }
}

impl SetlistFmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

impl AppConfig {
    /// Load config from `~/.config/setstats/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::parse(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Parse config from TOML text.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Get the config file path.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
