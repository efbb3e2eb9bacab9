//! Structured logging initialization for the gridshift proxy.
//!
//! Supports both human-friendly and machine-readable (JSON) output formats,
//! with proper TTY detection and verbosity control.

use std::io::{self, IsTerminal};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// # Arguments
///
/// * `json_logs` - If true, output structured JSON logs for log pipelines
/// * `verbose` - Verbosity level: 0 = info, 1 = debug, 2+ = trace
/// * `quiet` - If true, suppress non-essential output (only errors)
///
/// # Environment Variables
///
/// * `RUST_LOG` - Override default filter (e.g., "gridshift=debug,tower_http=warn")
///
/// # Output Behavior
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | JSON | any | JSON lines to stderr |
/// | Text | yes | Pretty colored output to stderr |
/// | Text | no | Compact plain output to stderr |
pub fn init_logging(json_logs: bool, verbose: u8, quiet: bool) {
    // Build the filter directive based on verbosity
    let default_directive = if quiet {
        "gridshift=error"
    } else {
        match verbose {
            0 => "gridshift=info",
            1 => "gridshift=debug,tower_http=debug",
            _ => "gridshift=trace,tower_http=trace",
        }
    };

    // Allow RUST_LOG to override, but use our default otherwise
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    if json_logs {
        // JSON output for log collectors
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else if io::stderr().is_terminal() {
        // Pretty output for interactive terminals
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else {
        // Compact output for non-TTY (piped, redirected)
        let fmt_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}
