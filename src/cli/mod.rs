//! CLI argument definitions.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{AppConfig, OriginMode};

/// Gridshift - grid-aware HTML rewriting proxy for WordPress sites.
///
/// Fronts an origin and themes outbound pages by the carbon intensity of
/// the visitor's electricity grid. Flags override the config file.
#[derive(Parser, Debug)]
#[command(name = "gridshift", version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short = 'c', env = "GRIDSHIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bind address for the inbound listener
    #[arg(long, short = 'b', env = "GRIDSHIFT_BIND")]
    pub bind: Option<String>,

    /// Production origin host (scheme included)
    #[arg(long, env = "GRIDSHIFT_ORIGIN")]
    pub origin: Option<String>,

    /// Use the development origin host
    #[arg(long)]
    pub dev: bool,

    /// Carbon data provider API key
    #[arg(long, env = "GRIDSHIFT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Emit JSON logs (for log pipelines)
    #[arg(long, env = "GRIDSHIFT_LOG_JSON")]
    pub log_json: bool,

    /// Verbose output (repeat for more detail)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl Cli {
    /// Overlay CLI flags on top of a loaded configuration.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind.clone_from(bind);
        }
        if let Some(origin) = &self.origin {
            config.origin.host.clone_from(origin);
        }
        if self.dev {
            config.origin.mode = OriginMode::Development;
        }
        if let Some(api_key) = &self.api_key {
            config.carbon.api_key.clone_from(api_key);
        }
    }
}
