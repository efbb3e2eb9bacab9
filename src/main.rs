//! Gridshift - grid-aware HTML rewriting proxy.
//!
//! Binary entry point: parse flags, initialize logging, load and overlay
//! configuration, then serve until shutdown.
#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use gridshift::cli::Cli;
use gridshift::config;
use gridshift::logging::init_logging;
use gridshift::proxy;

fn main() {
    let cli = Cli::parse();

    init_logging(cli.log_json, cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = config::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    cli.apply_to(&mut config);
    config.validate().context("invalid configuration")?;

    debug!(
        origin = config.active_origin(),
        bind = %config.server.bind,
        "Configuration resolved"
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime
        .block_on(proxy::serve(config))
        .context("server exited with error")?;
    Ok(())
}
