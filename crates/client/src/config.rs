//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `AVATAR_API_BASE_URL` - Backend base URL (default: `http://localhost:8000`)
//! - `AVATAR_REQUEST_TIMEOUT_SECS` - Timeout for every outbound call (default: 120)
//! - `AVATAR_SESSION_FILE` - Session key space file
//!   (default: `$HOME/.avatar-studio/session.json`)
//! - `AVATAR_SESSION_DEBOUNCE_MS` - Window in which bursts of session file events
//!   are collapsed (default: 250)
//! - `AVATAR_GEOCODER_URL` - Reverse geocoding endpoint
//!   (default: `https://api.bigdatacloud.net/data/reverse-geocode-client`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_GEOCODER_URL: &str = "https://api.bigdatacloud.net/data/reverse-geocode-client";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_DEBOUNCE_MS: u64 = 250;
const SESSION_DIR: &str = ".avatar-studio";
const SESSION_FILE: &str = "session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Avatar Studio client configuration.
///
/// Implements `Debug` manually to redact the Sentry DSN.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the avatar backend
    pub api_base_url: Url,
    /// Timeout applied to each outbound request
    pub request_timeout: Duration,
    /// File holding the persisted session key space
    pub session_file: PathBuf,
    /// Debounce window of the session file watcher
    pub session_debounce: Duration,
    /// Reverse geocoding endpoint
    pub geocoder_url: Url,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("session_file", &self.session_file)
            .field("session_debounce", &self.session_debounce)
            .field("geocoder_url", &self.geocoder_url.as_str())
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_url("AVATAR_API_BASE_URL", DEFAULT_API_BASE_URL)?;
        let geocoder_url = get_url("AVATAR_GEOCODER_URL", DEFAULT_GEOCODER_URL)?;
        let request_timeout = Duration::from_secs(get_positive(
            "AVATAR_REQUEST_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        let session_debounce =
            Duration::from_millis(get_positive("AVATAR_SESSION_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?);
        let session_file = get_optional_env("AVATAR_SESSION_FILE")
            .map_or_else(default_session_file, PathBuf::from);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api_base_url,
            request_timeout,
            session_file,
            session_debounce,
            geocoder_url,
            sentry_dsn,
        })
    }

    /// Configuration pointing at a given backend, with defaults elsewhere.
    ///
    /// Used by tests and embedders that do not read the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `api_base_url` is not a valid URL.
    pub fn for_backend(api_base_url: &str, session_file: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_url("api_base_url", api_base_url)?,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_file,
            session_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            geocoder_url: parse_url("geocoder_url", DEFAULT_GEOCODER_URL)?,
            sentry_dsn: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn get_url(key: &str, default: &str) -> Result<Url, ConfigError> {
    parse_url(key, &get_env_or_default(key, default))
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get a strictly positive integer with a default value.
fn get_positive(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    parse_positive(key, &raw)
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// `$HOME/.avatar-studio/session.json`, or relative to the working directory
/// when `HOME` is unset.
fn default_session_file() -> PathBuf {
    get_optional_env("HOME")
        .map_or_else(PathBuf::new, PathBuf::from)
        .join(SESSION_DIR)
        .join(SESSION_FILE)
}
