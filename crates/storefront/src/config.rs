//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPFRONT_API_BASE_URL` - Backend base URL (default: `http://localhost:8000`)
//! - `SHOPFRONT_SESSION_FILE` - Persist the session credential to this JSON file
//! - `SHOPFRONT_REQUEST_TIMEOUT_SECS` - Transport timeout (default: none)
//! - `SHOPFRONT_PRODUCT_CACHE_TTL_SECS` - Product cache TTL, `0` disables (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default backend location used by local development setups.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const DEFAULT_PRODUCT_CACHE_TTL_SECS: u64 = 300;

/// Longest accepted product cache TTL (one year).
pub const MAX_PRODUCT_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid base URL {0}: {1}")]
    InvalidBaseUrl(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL; endpoint paths are joined onto it
    pub base_url: Url,
    /// Where the session credential is persisted, if anywhere
    pub session_file: Option<PathBuf>,
    /// Transport timeout; `None` keeps the HTTP client default
    pub request_timeout: Option<Duration>,
    /// Product cache TTL; zero disables the cache
    pub product_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Build a configuration for `base_url` with every other setting at its
    /// default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if the URL does not parse or is
    /// not http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            session_file: None,
            request_timeout: None,
            product_cache_ttl: Duration::from_secs(DEFAULT_PRODUCT_CACHE_TTL_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("SHOPFRONT_API_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut config = Self::new(&base_url)?;
        config.session_file = non_empty(lookup("SHOPFRONT_SESSION_FILE")).map(PathBuf::from);
        config.request_timeout = parse_secs(&lookup, "SHOPFRONT_REQUEST_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        if let Some(ttl) = parse_secs(&lookup, "SHOPFRONT_PRODUCT_CACHE_TTL_SECS")? {
            let ttl = Duration::from_secs(ttl);
            if ttl > MAX_PRODUCT_CACHE_TTL {
                return Err(ConfigError::InvalidEnvVar(
                    "SHOPFRONT_PRODUCT_CACHE_TTL_SECS".to_string(),
                    format!("must be at most {} seconds", MAX_PRODUCT_CACHE_TTL.as_secs()),
                ));
            }
            config.product_cache_ttl = ttl;
        }
        config.sentry_dsn = non_empty(lookup("SENTRY_DSN"));
        config.sentry_environment = non_empty(lookup("SENTRY_ENVIRONMENT"));

        Ok(config)
    }

    /// Whether product reads should go through the cache.
    #[must_use]
    pub const fn product_cache_enabled(&self) -> bool {
        !self.product_cache_ttl.is_zero()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and validate the backend base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidBaseUrl(raw.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl(
            raw.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Treat blank values as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse an optional whole number of seconds.
fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, ConfigError> {
    non_empty(lookup(key))
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/");
        assert!(config.session_file.is_none());
        assert!(config.request_timeout.is_none());
        assert_eq!(config.product_cache_ttl, Duration::from_secs(300));
        assert!(config.product_cache_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("SHOPFRONT_API_BASE_URL", "https://shop.example.com/"),
            ("SHOPFRONT_SESSION_FILE", "/tmp/session.json"),
            ("SHOPFRONT_REQUEST_TIMEOUT_SECS", "15"),
            ("SHOPFRONT_PRODUCT_CACHE_TTL_SECS", "0"),
            ("SENTRY_DSN", ""),
        ]))
        .unwrap();

        assert_eq!(config.base_url.host_str(), Some("shop.example.com"));
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/session.json")));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
        assert!(!config.product_cache_enabled());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_timeout() {
        let result = ClientConfig::from_lookup(lookup_from(&[(
            "SHOPFRONT_REQUEST_TIMEOUT_SECS",
            "soon",
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "SHOPFRONT_REQUEST_TIMEOUT_SECS"));
    }

    #[test]
    fn test_cache_ttl_limit() {
        let max = MAX_PRODUCT_CACHE_TTL.as_secs().to_string();
        let config = ClientConfig::from_lookup(lookup_from(&[(
            "SHOPFRONT_PRODUCT_CACHE_TTL_SECS",
            &max,
        )]))
        .unwrap();
        assert_eq!(config.product_cache_ttl, MAX_PRODUCT_CACHE_TTL);

        let too_long = (MAX_PRODUCT_CACHE_TTL.as_secs() + 1).to_string();
        let result = ClientConfig::from_lookup(lookup_from(&[(
            "SHOPFRONT_PRODUCT_CACHE_TTL_SECS",
            &too_long,
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "SHOPFRONT_PRODUCT_CACHE_TTL_SECS"));

        let result = ClientConfig::from_lookup(lookup_from(&[(
            "SHOPFRONT_PRODUCT_CACHE_TTL_SECS",
            &u64::MAX.to_string(),
        )]));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        assert!(matches!(
            ClientConfig::new("ftp://shop.example.com"),
            Err(ConfigError::InvalidBaseUrl(_, _))
        ));
        assert!(ClientConfig::new("not a url").is_err());
    }
}
