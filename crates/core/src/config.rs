//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The parsing helpers take the raw environment *values* rather than
//! reading the environment themselves, so binaries decide where values come from and tests
//! never touch process-wide state.

use crate::constants::{
    DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_REST_ADDR, DEFAULT_SOURCE_URL, DEFAULT_TARGET_URL,
};
use crate::error::{ConfigError, ConfigResult};
use std::time::Duration;
use url::Url;

/// Environment key for the source proxy base URL.
pub const SOURCE_URL_KEY: &str = "BRIDGE_SOURCE_URL";
/// Environment key for the FHIR server base URL.
pub const TARGET_URL_KEY: &str = "BRIDGE_TARGET_URL";
/// Environment key for the per-fetch timeout in milliseconds.
pub const FETCH_TIMEOUT_KEY: &str = "BRIDGE_FETCH_TIMEOUT_MS";
/// Environment key for the REST listen address.
pub const REST_ADDR_KEY: &str = "BRIDGE_REST_ADDR";

/// Bridge configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    source_base_url: Url,
    target_base_url: Url,
    fetch_timeout: Duration,
    rest_addr: String,
}

/// Raw, unvalidated configuration values as read from the environment.
#[derive(Clone, Debug, Default)]
pub struct EnvValues {
    pub source_url: Option<String>,
    pub target_url: Option<String>,
    pub fetch_timeout_ms: Option<String>,
    pub rest_addr: Option<String>,
}

impl EnvValues {
    /// Read the bridge keys from the process environment.
    ///
    /// Call this once from a binary's `main`; library code receives a [`BridgeConfig`].
    pub fn from_process_env() -> Self {
        Self {
            source_url: std::env::var(SOURCE_URL_KEY).ok(),
            target_url: std::env::var(TARGET_URL_KEY).ok(),
            fetch_timeout_ms: std::env::var(FETCH_TIMEOUT_KEY).ok(),
            rest_addr: std::env::var(REST_ADDR_KEY).ok(),
        }
    }
}

impl BridgeConfig {
    /// Create a new `BridgeConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `fetch_timeout` is zero.
    pub fn new(
        source_base_url: Url,
        target_base_url: Url,
        fetch_timeout: Duration,
        rest_addr: String,
    ) -> ConfigResult<Self> {
        if fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: FETCH_TIMEOUT_KEY,
                reason: "timeout must be greater than zero".into(),
            });
        }

        Ok(Self {
            source_base_url,
            target_base_url,
            fetch_timeout,
            rest_addr,
        })
    }

    /// Build a configuration from raw values, applying defaults for missing or blank ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a URL does not parse or the timeout is not a positive
    /// integer.
    pub fn from_env_values(values: EnvValues) -> ConfigResult<Self> {
        let source = url_from_env_value(SOURCE_URL_KEY, values.source_url, DEFAULT_SOURCE_URL)?;
        let target = url_from_env_value(TARGET_URL_KEY, values.target_url, DEFAULT_TARGET_URL)?;
        let timeout = fetch_timeout_from_env_value(values.fetch_timeout_ms)?;
        let rest_addr = non_blank(values.rest_addr).unwrap_or_else(|| DEFAULT_REST_ADDR.into());

        Self::new(source, target, timeout, rest_addr)
    }

    pub fn source_base_url(&self) -> &Url {
        &self.source_base_url
    }

    pub fn target_base_url(&self) -> &Url {
        &self.target_base_url
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn rest_addr(&self) -> &str {
        &self.rest_addr
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a base URL from an optional value, falling back to `default`.
///
/// A trailing slash is ensured so relative joins keep the last path segment.
pub fn url_from_env_value(
    key: &'static str,
    value: Option<String>,
    default: &str,
) -> ConfigResult<Url> {
    let raw = non_blank(value).unwrap_or_else(|| default.to_string());
    let with_slash = if raw.ends_with('/') {
        raw
    } else {
        format!("{raw}/")
    };

    let url = Url::parse(&with_slash).map_err(|e| ConfigError::InvalidValue {
        key,
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(url)
}

/// Parse the per-fetch timeout (milliseconds) from an optional value.
///
/// If `value` is `None` or empty/whitespace, returns the default timeout.
pub fn fetch_timeout_from_env_value(value: Option<String>) -> ConfigResult<Duration> {
    let Some(raw) = non_blank(value) else {
        return Ok(Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS));
    };

    let millis: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: FETCH_TIMEOUT_KEY,
        reason: format!("'{raw}' is not a whole number of milliseconds"),
    })?;

    if millis == 0 {
        return Err(ConfigError::InvalidValue {
            key: FETCH_TIMEOUT_KEY,
            reason: "timeout must be greater than zero".into(),
        });
    }

    Ok(Duration::from_millis(millis))
}
