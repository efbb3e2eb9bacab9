//! Error types for gridshift operations.

use thiserror::Error;

/// Primary error type for the request-rewriting path.
///
/// Every variant that can occur while handling a request is classified as
/// either fail-open (serve the origin response unmodified) or fatal to
/// startup. Nothing in this enum is ever shown to an end user.
#[derive(Error, Debug)]
pub enum GridError {
    // Request-path errors (all fail open)
    #[error("Origin fetch failed for {url}: {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    #[error("No country code available for request")]
    LocationUnresolvable,

    #[error("Carbon data provider error for {country}: {reason}")]
    Provider { country: String, reason: String },

    #[error("Carbon data provider timed out for {country} after {timeout_ms}ms")]
    ProviderTimeout { country: String, timeout_ms: u64 },

    #[error("Cache entry for {country} could not be deserialized: {reason}")]
    CacheDeserialization { country: String, reason: String },

    #[error("Cache store error: {0}")]
    CacheStore(String),

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // Server errors
    #[error("Server failed to start on {addr}: {reason}")]
    ServerStartup { addr: String, reason: String },

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl GridError {
    /// Returns true if the error must degrade to serving the unmodified
    /// origin response rather than failing the request.
    pub const fn is_fail_open(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. }
                | Self::LocationUnresolvable
                | Self::Provider { .. }
                | Self::ProviderTimeout { .. }
                | Self::CacheDeserialization { .. }
                | Self::CacheStore(_)
        )
    }

    /// Short stable label for structured log fields.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::LocationUnresolvable => "location_unresolvable",
            Self::Provider { .. } => "provider_error",
            Self::ProviderTimeout { .. } => "provider_timeout",
            Self::CacheDeserialization { .. } => "cache_deserialization",
            Self::CacheStore(_) => "cache_store",
            Self::ConfigNotFound { .. } => "config_not_found",
            Self::ConfigParse(_) => "config_parse",
            Self::ConfigInvalid(_) => "config_invalid",
            Self::ServerStartup { .. } => "server_startup",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for Results using GridError.
pub type Result<T> = std::result::Result<T, GridError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| GridError::Other(format!("{}: {e}", f().into())))
    }
}
