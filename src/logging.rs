//! Runtime log setup on top of `tracing-subscriber`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::ConfigError;

/// Level used when nothing else is configured.
pub const DEFAULT_LEVEL: &str = "warn";

/// Build the filter for `level`, keeping sqlx's per-query logging quiet
/// unless the directive names sqlx itself.
pub fn build_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    let level = level.trim();
    let level = if level.is_empty() { DEFAULT_LEVEL } else { level };

    let directives = if level.contains("sqlx") {
        level.to_string()
    } else {
        format!("{level},sqlx=warn")
    };

    EnvFilter::try_new(&directives).map_err(|source| ConfigError::LogLevel {
        level: level.to_string(),
        source,
    })
}

/// Install the global subscriber. Logs go to stderr so stdout carries only
/// progress output.
pub fn init(level: &str) -> Result<(), ConfigError> {
    let filter = build_filter(level)?;

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();

    Ok(())
}
