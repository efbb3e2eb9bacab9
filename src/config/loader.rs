//! Loader for the gridshift TOML configuration file.

use std::path::Path;

use tracing::debug;

use super::AppConfig;
use crate::error::{GridError, Result};

/// Load and validate a configuration file.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GridError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            GridError::Io(e)
        }
    })?;

    let config: AppConfig = toml::from_str(&contents)
        .map_err(|e| GridError::ConfigParse(format!("{}: {e}", path.display())))?;

    config.validate()?;
    debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Load a configuration file if one was given, defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(p) => load_file(p),
        None => Ok(AppConfig::default()),
    }
}
