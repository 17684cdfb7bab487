use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::LibraryMode;
use crate::error::BibError;

pub const DEFAULT_CONFIG_FILE: &str = "bibfetch.json";
pub const DEFAULT_PROVIDER: &str = "DOI";
pub const DEFAULT_KEY_PATTERN: &str = "[auth][year]";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub default_provider: Option<String>,
    #[serde(default)]
    pub key_pattern: Option<String>,
    #[serde(default)]
    pub mode: Option<LibraryMode>,
    #[serde(default)]
    pub library: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub mailto: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern(String);

impl KeyPattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for KeyPattern {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PATTERN)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub default_provider: String,
    pub key_pattern: KeyPattern,
    pub mode: LibraryMode,
    pub library_path: Utf8PathBuf,
    pub review_path: Utf8PathBuf,
    pub preferences_path: Option<Utf8PathBuf>,
    pub timeout: Duration,
    pub mailto: Option<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, BibError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BibError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| BibError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            default_provider: config
                .default_provider
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            key_pattern: config
                .key_pattern
                .map(|pattern| KeyPattern::new(&pattern))
                .unwrap_or_default(),
            mode: config.mode.unwrap_or_default(),
            library_path: Utf8PathBuf::from(
                config.library.unwrap_or_else(|| "library.json".to_string()),
            ),
            review_path: Utf8PathBuf::from(
                config.review.unwrap_or_else(|| "review.json".to_string()),
            ),
            preferences_path: config.preferences.map(Utf8PathBuf::from),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(30)),
            mailto: config.mailto,
        }
    }
}
