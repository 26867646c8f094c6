//! Transport configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the base URI.
pub const ENV_URL: &str = "OPENCPU_URL";

/// Environment variable overriding the request timeout, in seconds.
pub const ENV_TIMEOUT: &str = "OPENCPU_TIMEOUT";

const DEFAULT_BASE_URI: &str = "http://localhost:5656/ocpu/";

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Settings for [`crate::HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Server root, e.g. `https://cloud.opencpu.org/ocpu/`. Always ends with `/`.
    pub base_uri: String,
    /// Whole-request timeout.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Turn 4xx/5xx responses into client/server errors inside the transport.
    pub http_errors: bool,
    pub user_agent: String,
    /// Basic auth credentials.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            http_errors: true,
            user_agent: concat!("opencpu-client/", env!("CARGO_PKG_VERSION")).to_string(),
            username: None,
            password: None,
        }
    }
}

impl TransportConfig {
    /// Default settings pointing at `base_uri`.
    #[must_use]
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            ..Self::default()
        }
        .normalized()
    }

    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("opencpu-client").join("config.json"))
    }

    /// Load defaults, then the config file if present, then environment
    /// overrides.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed, or if
    /// an environment override is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.normalized())
    }

    /// Apply overrides from a key lookup (the process environment in
    /// [`TransportConfig::load`]).
    ///
    /// # Errors
    /// Returns error if the timeout override is not a number.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL).filter(|url| !url.trim().is_empty()) {
            self.base_uri = url.trim().to_string();
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            self.timeout_secs = timeout
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_TIMEOUT.to_string(),
                    value: timeout,
                })?;
        }
        Ok(self.normalized())
    }

    pub(crate) fn normalized(mut self) -> Self {
        if !self.base_uri.ends_with('/') {
            self.base_uri.push('/');
        }
        self
    }
}
