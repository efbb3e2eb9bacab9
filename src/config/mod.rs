//! Configuration for the gridshift proxy.
//!
//! Configuration layers, lowest precedence first: built-in defaults, an
//! optional TOML file, then CLI flags / environment (applied by the
//! binary). The schema lives here; file loading is in [`loader`].

mod loader;

pub use loader::{load_file, load_or_default};

use serde::{Deserialize, Serialize};

use crate::carbon::DataMode;
use crate::error::{GridError, Result};

/// Which origin host the proxy fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginMode {
    #[default]
    Production,
    Development,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub origin: OriginConfig,
    pub rewrite: RewriteConfig,
    pub carbon: CarbonConfig,
}

/// Inbound listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. `127.0.0.1:8787`.
    pub bind: String,
}

/// Origin selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OriginConfig {
    /// Production origin host, scheme included.
    pub host: String,
    /// Development origin host, used when `mode = "development"`.
    pub dev_host: String,
    pub mode: OriginMode,
}

/// Dispatcher bypass rules and geolocation input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Path prefixes served verbatim, with no intensity resolution.
    pub excluded_paths: Vec<String>,
    /// Response content types eligible for rewriting.
    pub content_types: Vec<String>,
    /// Request header carrying the visitor's country code, set by the
    /// fronting CDN.
    pub geo_header: String,
}

/// Carbon-data provider and cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarbonConfig {
    /// Provider API base URL.
    pub api_url: String,
    /// Provider API key. Usually supplied via `GRIDSHIFT_API_KEY`.
    pub api_key: String,
    /// Which payload share counts as low-carbon: `low-carbon` or `renewable`.
    pub data_mode: String,
    /// Cache TTL for readings, in seconds.
    pub cache_ttl_secs: u64,
    /// Bound on the provider call; a timeout fails open.
    pub timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            origin: OriginConfig::default(),
            rewrite: RewriteConfig::default(),
            carbon: CarbonConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            host: "https://example.com".to_string(),
            dev_host: "http://localhost:8080".to_string(),
            mode: OriginMode::Production,
        }
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            excluded_paths: vec![
                "/wp-content".to_string(),
                "/wp-admin".to_string(),
                "/wp-login.php".to_string(),
                "/wp-includes".to_string(),
                "/wp-json".to_string(),
            ],
            content_types: vec!["text/html".to_string(), "text/plain".to_string()],
            geo_header: "cf-ipcountry".to_string(),
        }
    }
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.electricitymap.org/v3".to_string(),
            api_key: String::new(),
            data_mode: "low-carbon".to_string(),
            cache_ttl_secs: 3600,
            timeout_ms: 2000,
        }
    }
}

impl AppConfig {
    /// The origin host the active mode points at.
    #[must_use]
    pub fn active_origin(&self) -> &str {
        match self.origin.mode {
            OriginMode::Production => &self.origin.host,
            OriginMode::Development => &self.origin.dev_host,
        }
    }

    /// Parsed carbon data mode.
    pub fn data_mode(&self) -> Result<DataMode> {
        DataMode::parse(&self.carbon.data_mode).ok_or_else(|| {
            GridError::ConfigInvalid(format!(
                "carbon.data_mode must be \"low-carbon\" or \"renewable\", got {:?}",
                self.carbon.data_mode
            ))
        })
    }

    /// Check cross-field constraints not expressible in the schema.
    pub fn validate(&self) -> Result<()> {
        self.data_mode()?;

        for host in [&self.origin.host, &self.origin.dev_host] {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                return Err(GridError::ConfigInvalid(format!(
                    "origin host must include a scheme: {host:?}"
                )));
            }
            if host.ends_with('/') {
                return Err(GridError::ConfigInvalid(format!(
                    "origin host must not end with a slash: {host:?}"
                )));
            }
        }

        if self.carbon.timeout_ms == 0 {
            return Err(GridError::ConfigInvalid(
                "carbon.timeout_ms must be positive".to_string(),
            ));
        }

        if self.rewrite.content_types.is_empty() {
            return Err(GridError::ConfigInvalid(
                "rewrite.content_types must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
