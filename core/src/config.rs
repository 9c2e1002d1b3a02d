//! Client configuration: base URL, request timeout and default headers.
//!
//! A `ClientConfig` is immutable once built. It can be assembled in code,
//! read from the environment, or loaded from a TOML file; every loader runs
//! `validate` before handing the value back.
//!
//! Environment variables:
//! - `ACCESS_API_BASE_URL` (default `http://10.102.0.108:8191/api`)
//! - `ACCESS_API_TIMEOUT_MS` (default `10000`)
//! - `ACCESS_API_HEADERS`, comma-separated `Name: value` pairs merged over
//!   the default headers
//!
//! TOML layout:
//! ```toml
//! base_url = "http://localhost:8191/api"
//! timeout_ms = 5000
//!
//! [default_headers]
//! Accept = "application/json"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "http://10.102.0.108:8191/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

pub const ENV_BASE_URL: &str = "ACCESS_API_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "ACCESS_API_TIMEOUT_MS";
pub const ENV_HEADERS: &str = "ACCESS_API_HEADERS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("base URL must not be empty")]
    EmptyBaseUrl,

    #[error("timeout must be a positive number of milliseconds")]
    ZeroTimeout,

    #[error("invalid timeout {0:?}: expected milliseconds")]
    InvalidTimeout(String),

    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
}

/// Base URL, timeout and default headers applied to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    timeout_ms: u64,
    default_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = BTreeMap::new();
        default_headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            default_headers,
        }
    }
}

impl ClientConfig {
    /// Defaults with a different base URL. The URL is kept verbatim.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Add or replace a default header. Names match case-insensitively.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.default_headers, name.into(), value.into());
        self
    }

    /// Drop every default header, including `Content-Type`.
    pub fn without_default_headers(mut self) -> Self {
        self.default_headers.clear();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn default_headers(&self) -> &BTreeMap<String, String> {
        &self.default_headers
    }

    /// Reject values that can never produce a working client.
    ///
    /// The URL itself is not parsed; a malformed URL surfaces as a network
    /// error on the first request. Empty header values are legal HTTP.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        for (name, value) in &self.default_headers {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidHeader(format!("{name}: {value}")));
            }
        }
        Ok(())
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.timeout_ms = parse_timeout(&raw)?;
        }
        if let Some(raw) = lookup(ENV_HEADERS) {
            for (name, value) in parse_header_list(&raw)? {
                set_header(&mut config.default_headers, name, value);
            }
        }
        config.validate()?;
        debug!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "loaded client config from environment");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(raw)?;
        let mut config = Self::default();
        if let Some(base_url) = file.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout_ms) = file.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        for (name, value) in file.default_headers {
            set_header(&mut config.default_headers, name, value);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        debug!(path = %path.display(), base_url = %config.base_url, "loaded client config from file");
        Ok(config)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    default_headers: BTreeMap<String, String>,
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTimeout(raw.to_string()))
}

fn parse_header_list(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, value) = entry
                .split_once(':')
                .ok_or_else(|| ConfigError::InvalidHeader(entry.to_string()))?;
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() {
                return Err(ConfigError::InvalidHeader(entry.to_string()));
            }
            Ok((name.to_string(), value.to_string()))
        })
        .collect()
}

fn set_header(headers: &mut BTreeMap<String, String>, name: String, value: String) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
    headers.insert(name, value);
}
