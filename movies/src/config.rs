//! Configuration for the movie search store and its OMDb catalog
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables (`OMDB_API_KEY`, `OMDB_BASE_URL`, `MOVIE_SEARCH_TIMEOUT_MS`)
//!
//! The merged result is validated before use. Validation also checks that
//! the search timeout outlasts the worst case of the retried catalog call.
//!
//! # Example
//!
//! ```no_run
//! use cinestate_movies::config::MovieSearchConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MovieSearchConfig::load(Some(Path::new("movie-search.toml")))?;
//! println!("Search timeout: {:?}", config.search_timeout());
//! # Ok(())
//! # }
//! ```
//!
//! File format:
//!
//! ```toml
//! search_timeout_ms = 35000
//! fetch_timeout_ms = 10000
//! broadcast_capacity = 16
//!
//! [retry]
//! max_retries = 2
//! initial_delay_ms = 200
//! max_delay_ms = 5000
//! multiplier = 2.0
//!
//! [omdb]
//! base_url = "https://www.omdbapi.com"
//! api_key = "..."
//! ```

use cinestate_omdb::{DEFAULT_BASE_URL, OmdbClient};
use cinestate_runtime::StoreConfig;
use cinestate_runtime::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the OMDb API key
pub const ENV_API_KEY: &str = "OMDB_API_KEY";
/// Environment variable overriding the OMDb base URL
pub const ENV_BASE_URL: &str = "OMDB_BASE_URL";
/// Environment variable overriding the search timeout, in milliseconds
pub const ENV_SEARCH_TIMEOUT_MS: &str = "MOVIE_SEARCH_TIMEOUT_MS";

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {message}")]
    Io {
        /// File that was requested
        path: String,
        /// OS error message
        message: String,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// An override variable held an unusable value
    #[error("Invalid value for {name}: {value}")]
    InvalidEnvVar {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },

    /// Values are individually well-formed but unusable
    #[error("Configuration validation failed: {0}")]
    Validation(String),

    /// The OMDb catalog was requested without an API key
    #[error("No OMDb API key configured (set {ENV_API_KEY} or omdb.api_key)")]
    MissingApiKey,
}

/// Upper bound for `retry.max_retries`
pub const MAX_RETRIES: usize = 10;

/// Retry settings for catalog calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Upper bound for any delay
    pub max_delay_ms: u64,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            multiplier: policy.multiplier,
        }
    }
}

impl RetryConfig {
    /// Validate retry configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::Validation(
                "retry.multiplier must be a finite number >= 1.0".to_string(),
            ));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::Validation(format!(
                "retry.max_retries must be <= {MAX_RETRIES}"
            )));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::Validation(
                "retry.max_delay_ms must be >= retry.initial_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the runtime retry policy
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .multiplier(self.multiplier)
            .build()
    }
}

/// OMDb connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OmdbConfig {
    /// API host
    pub base_url: String,
    /// API key; usually supplied through `OMDB_API_KEY`
    pub api_key: Option<String>,
}

impl Default for OmdbConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for OmdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmdbConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl OmdbConfig {
    /// Validate OMDb configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "omdb.base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }
}

/// Complete movie search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieSearchConfig {
    /// How long a caller waits for a search to settle
    pub search_timeout_ms: u64,
    /// Timeout of a single catalog HTTP request
    pub fetch_timeout_ms: u64,
    /// Action broadcast buffer size
    pub broadcast_capacity: usize,
    /// Catalog retry settings
    pub retry: RetryConfig,
    /// OMDb connection
    pub omdb: OmdbConfig,
}

impl Default for MovieSearchConfig {
    fn default() -> Self {
        Self {
            search_timeout_ms: 35_000,
            fetch_timeout_ms: 10_000,
            broadcast_capacity: StoreConfig::default().broadcast_capacity,
            retry: RetryConfig::default(),
            omdb: OmdbConfig::default(),
        }
    }
}

impl MovieSearchConfig {
    /// Load defaults, then `path` if given, then environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, an override is
    /// malformed, or the merged configuration fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Parse a TOML file without applying overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid for this schema
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns error if `MOVIE_SEARCH_TIMEOUT_MS` is not a number
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_API_KEY) {
            self.omdb.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.omdb.base_url = url.trim().to_string();
        }
        if let Some(value) = lookup(ENV_SEARCH_TIMEOUT_MS) {
            self.search_timeout_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnvVar {
                        name: ENV_SEARCH_TIMEOUT_MS,
                        value,
                    })?;
        }
        Ok(())
    }

    /// Validate the complete configuration
    ///
    /// # Errors
    ///
    /// Returns error if any section is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "search_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "fetch_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Validation(
                "broadcast_capacity must be > 0".to_string(),
            ));
        }
        self.retry.validate()?;
        self.omdb.validate()?;

        let budget = self.fetch_budget();
        if self.search_timeout() < budget {
            return Err(ConfigError::Validation(format!(
                "search_timeout_ms ({}) is shorter than the worst-case catalog call ({}ms)",
                self.search_timeout_ms,
                budget.as_millis()
            )));
        }
        Ok(())
    }

    /// Longest a catalog call can take: every attempt timing out, plus the
    /// backoff pauses between attempts
    #[must_use]
    pub fn fetch_budget(&self) -> Duration {
        let policy = self.retry.policy();
        let attempts = u32::try_from(policy.max_retries.saturating_add(1)).unwrap_or(u32::MAX);

        (0..policy.max_retries)
            .map(|retry| policy.delay_for_attempt(retry))
            .fold(self.fetch_timeout().saturating_mul(attempts), Duration::saturating_add)
    }

    /// How long a caller waits for a search to settle
    #[must_use]
    pub const fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    /// Timeout of a single catalog request
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Store runtime configuration
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_broadcast_capacity(self.broadcast_capacity)
    }

    /// Build an OMDb client from these settings
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if no key is configured
    pub fn omdb_client(&self) -> Result<OmdbClient, ConfigError> {
        let api_key = self
            .omdb
            .api_key
            .clone()
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(OmdbClient::new(api_key)
            .with_base_url(self.omdb.base_url.clone())
            .with_timeout(self.fetch_timeout()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = MovieSearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search_timeout(), Duration::from_secs(35));
        assert_eq!(config.retry.policy(), RetryPolicy::default());
        assert_eq!(config.omdb.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_default_search_timeout_covers_retried_fetch() {
        let config = MovieSearchConfig::default();

        // 3 attempts of 10s plus pauses of 200ms and 400ms
        assert_eq!(config.fetch_budget(), Duration::from_millis(30_600));
        assert!(config.search_timeout() >= config.fetch_budget());
    }

    #[test]
    fn test_search_timeout_shorter_than_fetch_budget_is_rejected() {
        let config = MovieSearchConfig {
            search_timeout_ms: 15_000,
            ..MovieSearchConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let no_retries = MovieSearchConfig {
            search_timeout_ms: 10_000,
            retry: RetryConfig {
                max_retries: 0,
                ..RetryConfig::default()
            },
            ..MovieSearchConfig::default()
        };
        assert_eq!(no_retries.fetch_budget(), Duration::from_secs(10));
        assert!(no_retries.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MovieSearchConfig::from_toml_str(
            r#"
            search_timeout_ms = 2500

            [retry]
            max_retries = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.search_timeout_ms, 2500);
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.retry.initial_delay_ms, 200);
        assert_eq!(config.fetch_timeout_ms, 10_000);
    }

    #[test]
    fn test_unknown_types_are_parse_errors() {
        let err = MovieSearchConfig::from_toml_str("search_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let mut config = MovieSearchConfig::from_toml_str(
            r#"
            [omdb]
            api_key = "from-file"
            "#,
        )
        .unwrap();

        config
            .apply_overrides(env(&[
                ("OMDB_API_KEY", "from-env"),
                ("OMDB_BASE_URL", "http://localhost:8080"),
                ("MOVIE_SEARCH_TIMEOUT_MS", " 750 "),
            ]))
            .unwrap();

        assert_eq!(config.omdb.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.omdb.base_url, "http://localhost:8080");
        assert_eq!(config.search_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = MovieSearchConfig::default();
        config
            .apply_overrides(env(&[("OMDB_API_KEY", "  ")]))
            .unwrap();
        assert_eq!(config.omdb.api_key, None);
    }

    #[test]
    fn test_bad_timeout_override() {
        let mut config = MovieSearchConfig::default();
        let err = config
            .apply_overrides(env(&[("MOVIE_SEARCH_TIMEOUT_MS", "fast")]))
            .unwrap_err();

        assert_eq!(
            err,
            ConfigError::InvalidEnvVar {
                name: ENV_SEARCH_TIMEOUT_MS,
                value: "fast".to_string()
            }
        );
    }

    #[test]
    fn test_validation_failures() {
        let zero_timeout = MovieSearchConfig {
            search_timeout_ms: 0,
            ..MovieSearchConfig::default()
        };
        assert!(zero_timeout.validate().is_err());

        let mut bad_retry = MovieSearchConfig::default();
        bad_retry.retry.multiplier = 0.5;
        assert!(bad_retry.validate().is_err());

        let mut endless_retry = MovieSearchConfig::default();
        endless_retry.retry.max_retries = MAX_RETRIES + 1;
        assert!(endless_retry.validate().is_err());

        let mut bad_url = MovieSearchConfig::default();
        bad_url.omdb.base_url = "omdbapi.com".to_string();
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_omdb_client_requires_key() {
        let config = MovieSearchConfig::default();
        assert_eq!(config.omdb_client().unwrap_err(), ConfigError::MissingApiKey);

        let mut config = MovieSearchConfig::default();
        config.omdb.api_key = Some("k".to_string());
        config.omdb.base_url = "http://127.0.0.1:9999".to_string();
        assert_eq!(config.omdb_client().unwrap().base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "broadcast_capacity = 64").unwrap();

        let config = MovieSearchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.store_config().broadcast_capacity, 64);

        let missing = MovieSearchConfig::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
