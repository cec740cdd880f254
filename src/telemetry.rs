//! Structured logging setup for binaries hosting the sweeper.

use tracing_subscriber::EnvFilter;

/// Filter used when neither an explicit directive nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Builds the event filter from an explicit directive, then `RUST_LOG`, then
/// [`DEFAULT_LOG_FILTER`].
///
/// An unparsable explicit directive falls back to the default rather than
/// silencing all output.
#[must_use]
pub fn env_filter(directive: Option<&str>) -> EnvFilter {
    let parsed = directive.map_or_else(
        || EnvFilter::try_from_default_env().ok(),
        |value| EnvFilter::try_new(value).ok(),
    );
    parsed.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs a global `tracing` subscriber writing to stderr.
///
/// # Errors
///
/// Returns an error when a global subscriber is already installed.
pub fn init(
    directive: Option<&str>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(directive))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
}
