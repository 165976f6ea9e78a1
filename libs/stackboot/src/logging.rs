use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::{ConsoleFormat, LoggingConfig};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `cfg.level` when set.
///
/// # Errors
/// Returns an error if the level is not a valid filter directive or a global
/// subscriber is already installed.
pub fn init_logging(cfg: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cfg.level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match cfg.console_format {
        ConsoleFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?,
        ConsoleFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()?,
    }

    tracing::debug!(level = %cfg.level, format = ?cfg.console_format, "Logging initialized");
    Ok(())
}
