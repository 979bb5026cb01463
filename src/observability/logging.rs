//! # Logging
//!
//! Installs the global `tracing` subscriber.
//!
//! Output goes to stderr because stdout carries host responses.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};

/// Filter used when `RUST_LOG` is not set
#[must_use]
pub fn default_filter(config: &LogConfig) -> String {
    format!("zenlayercloud_provider={}", config.level.to_lowercase())
}

/// Initialize logging once for the process
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_ansi(false).try_init(),
    }
    .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_uses_configured_level() {
        let config = LogConfig {
            level: "DEBUG".to_string(),
            format: LogFormat::Text,
        };
        assert_eq!(default_filter(&config), "zenlayercloud_provider=debug");
    }
}
