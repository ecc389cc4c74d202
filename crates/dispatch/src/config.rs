//! Dispatch configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DISPATCH_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `YANDEX_GEOCODER_API_KEY` - Yandex Geocoder API key (high entropy, not a placeholder)
//!
//! ## Optional
//! - `GEOCODER_ENDPOINT` - Geocoder base URL (default: `https://geocode-maps.yandex.ru/1.x`)
//! - `GEOCODER_TIMEOUT_SECS` - Per-request geocoder timeout (default: 10)
//! - `GEOCODER_COALESCE_REQUESTS` - Share one in-flight lookup per address (default: false)
//! - `GEOCACHE_FRESHNESS_DAYS` - How long a cached resolution is trusted (default: 7)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::geo::{DEFAULT_FRESHNESS_DAYS, yandex::DEFAULT_ENDPOINT};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_GEOCODER_TIMEOUT_SECS: u64 = 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Dispatch application configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Geocoding service configuration
    pub geocoder: GeocoderConfig,
    /// How long a cached address resolution is trusted
    pub geocache_freshness: TimeDelta,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Geocoding service configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GeocoderConfig {
    /// Geocoder base URL
    pub endpoint: Url,
    /// API key sent with every request
    pub api_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
    /// Whether concurrent lookups of one address share a single request
    pub coalesce_requests: bool,
}

impl std::fmt::Debug for GeocoderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocoderConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("coalesce_requests", &self.coalesce_requests)
            .finish()
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("DISPATCH_DATABASE_URL")?;
        let geocoder = GeocoderConfig::from_env()?;

        let freshness_days: i64 = parse_env_or_default(
            "GEOCACHE_FRESHNESS_DAYS",
            DEFAULT_FRESHNESS_DAYS,
        )?;
        let geocache_freshness = TimeDelta::try_days(freshness_days)
            .filter(|window| *window > TimeDelta::zero())
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "GEOCACHE_FRESHNESS_DAYS".to_string(),
                    format!("must be a positive number of days (got {freshness_days})"),
                )
            })?;

        Ok(Self {
            database_url,
            geocoder,
            geocache_freshness,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl GeocoderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint = Url::parse(&get_env_or_default("GEOCODER_ENDPOINT", DEFAULT_ENDPOINT))
            .map_err(|e| ConfigError::InvalidEnvVar("GEOCODER_ENDPOINT".to_string(), e.to_string()))?;

        let timeout_secs: u64 =
            parse_env_or_default("GEOCODER_TIMEOUT_SECS", DEFAULT_GEOCODER_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "GEOCODER_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            api_key: get_validated_secret("YANDEX_GEOCODER_API_KEY")?,
            timeout: Duration::from_secs(timeout_secs),
            coalesce_requests: parse_env_or_default("GEOCODER_COALESCE_REQUESTS", false)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, using `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_accepts_uuid_key() {
        // Yandex issues UUID-shaped keys
        let result = validate_secret_strength("3f1c9a2e-7b4d-4e8a-9c61-d05b2f8e7a43", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_env_or_default_uses_default_when_unset() {
        let value: u64 = parse_env_or_default("FOODCART_TEST_UNSET_VARIABLE", 10).unwrap();
        assert_eq!(value, 10);
    }

    #[test]
    fn test_geocoder_config_debug_redacts_api_key() {
        let config = GeocoderConfig {
            endpoint: Url::parse(DEFAULT_ENDPOINT).unwrap(),
            api_key: SecretString::from("3f1c9a2e-7b4d-4e8a-9c61-d05b2f8e7a43"),
            timeout: Duration::from_secs(10),
            coalesce_requests: false,
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("geocode-maps.yandex.ru"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("3f1c9a2e"));
    }
}
