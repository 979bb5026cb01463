//! # Provider Configuration
//!
//! Settings for the vendor client, the retry engine and logging.
//!
//! The library never reads the environment itself: the binary calls
//! [`ProviderConfig::from_env`] once and passes the value to constructors.

use anyhow::{bail, Result};
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{
    DEFAULT_ENDPOINT, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_REQUEST_CLIENT, DEFAULT_RETRY_INTERVAL_MS,
};

/// Access key pair used to sign vendor requests
///
/// Wiped from memory on drop and never printed.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    access_key_id: String,
    access_key_password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(access_key_id: impl Into<String>, access_key_password: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_password: access_key_password.into(),
        }
    }

    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    #[must_use]
    pub fn access_key_password(&self) -> &str {
        &self.access_key_password
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.access_key_id.is_empty() && !self.access_key_password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_password", &"<redacted>")
            .finish()
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl LogFormat {
    /// Anything other than `text` selects JSON
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("text") {
            Self::Text
        } else {
            Self::Json
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Provider-level configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub credentials: Credentials,
    /// Base URL of the vendor API
    pub endpoint: String,
    /// Identifies this plugin in the `X-ZC-Request-Client` header
    pub request_client: String,
    /// Per-request HTTP timeout (seconds)
    pub http_timeout_secs: u64,
    /// Mean interval between retry attempts and waiter polls (milliseconds)
    pub retry_interval_ms: u64,
    pub log: LogConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_client: DEFAULT_REQUEST_CLIENT.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            log: LogConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            credentials: Credentials::new(
                var_or("ZENLAYERCLOUD_ACCESS_KEY_ID", ""),
                var_or("ZENLAYERCLOUD_ACCESS_KEY_PASSWORD", ""),
            ),
            endpoint: var_or("ZENLAYERCLOUD_ENDPOINT", DEFAULT_ENDPOINT),
            request_client: var_or("ZENLAYERCLOUD_REQUEST_CLIENT", DEFAULT_REQUEST_CLIENT),
            http_timeout_secs: parsed_or(
                &lookup,
                "ZENLAYERCLOUD_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            ),
            retry_interval_ms: parsed_or(
                &lookup,
                "ZENLAYERCLOUD_RETRY_INTERVAL_MS",
                DEFAULT_RETRY_INTERVAL_MS,
            ),
            log: LogConfig {
                level: var_or("LOG_LEVEL", "INFO"),
                format: LogFormat::parse(&var_or("LOG_FORMAT", "json")),
            },
        }
    }

    /// Check the settings the vendor client cannot work without
    ///
    /// # Errors
    /// Returns an error naming the first missing setting.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.access_key_id().is_empty() {
            bail!("ZENLAYERCLOUD_ACCESS_KEY_ID is not set");
        }
        if self.credentials.access_key_password().is_empty() {
            bail!("ZENLAYERCLOUD_ACCESS_KEY_PASSWORD is not set");
        }
        if self.endpoint.trim().is_empty() {
            bail!("ZENLAYERCLOUD_ENDPOINT must not be empty");
        }
        if self.http_timeout_secs == 0 {
            bail!("ZENLAYERCLOUD_HTTP_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Parse a variable or fall back to `default`
fn parsed_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
