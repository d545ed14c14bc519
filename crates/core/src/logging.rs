//! Logging setup for ragbot.
//!
//! Logs go to stderr so `ragbot query` output on stdout stays pipeable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Initialize the global tracing subscriber.
///
/// # Arguments
/// * `log_level` - Filter directive (e.g. "info", "ragbot_knowledge=debug"); defaults to "info"
/// * `no_color` - Disable ANSI colors
/// * `json` - Emit one JSON object per event instead of human-readable lines
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init_logging(log_level: Option<&str>, no_color: bool, json: bool) -> AppResult<()> {
    let env_filter = EnvFilter::try_new(log_level.unwrap_or("info"))
        .map_err(|e| AppError::Config(format!("Invalid log filter: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(!no_color),
            )
            .try_init()
    };

    result.map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

/// Initialize logging from a loaded configuration.
pub fn init_from_config(config: &AppConfig) -> AppResult<()> {
    init_logging(config.log_level.as_deref(), config.no_color, config.log_json)
}
