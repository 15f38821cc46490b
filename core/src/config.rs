//! Client configuration loaded from TOML.
//!
//! # Data Flow
//! ```text
//! routekit.toml
//!     → load_config / ClientConfig::from_toml_str (parse)
//!     → ClientConfig::validate (base URL must be usable)
//!     → ConfiguredProvider::from_config (Provider impl)
//!     → TransportConfig handed to the transport
//! ```
//!
//! All fields have defaults so a file only needs `provider.base_url`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::encoding::ParameterEncoding;
use crate::http::{Headers, HttpMethod};
use crate::params::Parameters;
use crate::provider::Provider;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub provider: ProviderConfig,
    pub transport: TransportConfig,
}

/// Defaults applied to every route.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub headers: BTreeMap<String, String>,
    pub params: Parameters,
    /// Per-method overrides of the default encoding table.
    pub default_encoding: BTreeMap<HttpMethod, ParameterEncoding>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Whole-exchange timeout; `0` disables it.
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl ClientConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_base_url(&self.provider.base_url).map(|_| ())
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    ClientConfig::from_toml_str(&content)
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    Ok(url)
}

/// `Provider` built from a `ProviderConfig`.
#[derive(Debug, Clone)]
pub struct ConfiguredProvider {
    base_url: Url,
    headers: Headers,
    params: Parameters,
    encodings: BTreeMap<HttpMethod, ParameterEncoding>,
}

impl ConfiguredProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(&config.base_url)?,
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            params: config.params.clone(),
            encodings: config.default_encoding.clone(),
        })
    }
}

impl Provider for ConfiguredProvider {
    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn additional_headers(&self) -> Headers {
        self.headers.clone()
    }

    fn additional_params(&self) -> Parameters {
        self.params.clone()
    }

    fn default_encoding(&self, method: HttpMethod) -> ParameterEncoding {
        self.encodings
            .get(&method)
            .copied()
            .unwrap_or_else(|| ParameterEncoding::for_method(method))
    }
}
