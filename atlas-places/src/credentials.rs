use std::path::PathBuf;
use std::time::Duration;

use crate::error::ProviderError;
use crate::media::DEFAULT_MAX_WIDTH;

pub const API_KEY_ENV: &str = "PLACES_API_KEY";
pub const BASE_URL_ENV: &str = "PLACES_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
const DEFAULT_REQUEST_INTERVAL_MS: u64 = 200;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Connection settings for the Places web service.
#[derive(Debug, Clone)]
pub struct PlacesConfig {
    pub api_key: String,
    pub base_url: String,
    /// Longest edge requested from the photo endpoint.
    pub max_width: u32,
    /// Minimum spacing between provider requests, shared by all workers.
    pub request_interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl PlacesConfig {
    /// Settings with built-in defaults and the given key.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_width: DEFAULT_MAX_WIDTH,
            request_interval: Duration::from_millis(DEFAULT_REQUEST_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load settings from environment variables and the config file.
    ///
    /// Priority: env vars > config file > defaults.
    /// Required: the API key. Its absence is a configuration error.
    pub fn load() -> Result<Self, ProviderError> {
        let section = load_config_file().and_then(|c| c.places);

        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| section.as_ref().and_then(|c| c.api_key.clone()))
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Config(format!(
                    "Missing Places API key. Set {} env var or add api_key to the [places] section of the config file",
                    API_KEY_ENV
                ))
            })?;

        let mut config = Self::with_key(api_key);

        if let Some(url) = std::env::var(BASE_URL_ENV)
            .ok()
            .or_else(|| section.as_ref().and_then(|c| c.base_url.clone()))
        {
            config.base_url = url;
        }
        if let Some(section) = section {
            if let Some(w) = section.max_width {
                config.max_width = w;
            }
            if let Some(ms) = section.request_interval_ms {
                config.request_interval = Duration::from_millis(ms);
            }
            if let Some(secs) = section.timeout_secs {
                config.timeout = Duration::from_secs(secs.max(1));
            }
        }

        Ok(config)
    }
}

/// Where the API key was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from an environment variable.
    EnvVar(&'static str),
    /// Loaded from the config file.
    ConfigFile,
    /// Not set anywhere.
    Missing,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvVar(var) => write!(f, "env ${}", var),
            Self::ConfigFile => write!(f, "config file"),
            Self::Missing => write!(f, "not set"),
        }
    }
}

/// TOML config file format. Other sections (e.g. `[sync]`) are read by the
/// crates that own them.
#[derive(Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places: Option<PlacesSection>,
    #[serde(flatten)]
    pub other: toml::Table,
}

#[derive(Debug, Default, Clone, serde::Deserialize, serde::Serialize)]
pub struct PlacesSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Return the path to the config file.
///
/// `ATLAS_MEDIA_CONFIG` overrides the platform config directory.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("ATLAS_MEDIA_CONFIG") {
        return Some(PathBuf::from(p));
    }
    dirs::config_dir().map(|d| d.join("atlas-media").join("config.toml"))
}

/// Read and parse the config file. Missing or unparseable files yield `None`.
pub fn load_config_file() -> Option<ConfigFile> {
    let path = config_path()?;
    let content = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Ignoring unreadable config file {}: {}", path.display(), e);
            None
        }
    }
}

/// Save the API key to the config file, creating parent directories as
/// needed and preserving every other setting already in the file.
///
/// Returns the path the file was written to.
pub fn save_api_key(api_key: &str) -> Result<PathBuf, ProviderError> {
    let path = config_path()
        .ok_or_else(|| ProviderError::Config("Could not determine config directory".to_string()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut config = match std::fs::read_to_string(&path) {
        Ok(content) => toml::from_str::<ConfigFile>(&content)
            .map_err(|e| ProviderError::Config(format!("Failed to parse {}: {}", path.display(), e)))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigFile::default(),
        Err(e) => return Err(e.into()),
    };

    let mut section = config.places.take().unwrap_or_default();
    section.api_key = Some(api_key.to_string());
    config.places = Some(section);

    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| ProviderError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(&path, toml_str)?;
    Ok(path)
}

/// Determine where the API key is coming from.
pub fn credential_source() -> CredentialSource {
    if std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty()) {
        CredentialSource::EnvVar(API_KEY_ENV)
    } else if load_config_file()
        .and_then(|c| c.places)
        .and_then(|p| p.api_key)
        .is_some()
    {
        CredentialSource::ConfigFile
    } else {
        CredentialSource::Missing
    }
}
