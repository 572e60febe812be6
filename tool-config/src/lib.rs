//! Configuration management for the remote tool loader.
//!
//! Values resolve from the process environment with documented defaults, or
//! deserialize from a host's own configuration file through [`LoaderConfig`]'s
//! `serde` implementation. Both paths run the same validation.

#![warn(missing_docs, clippy::pedantic)]

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Default executor base URL when `EXECUTOR_BASE_URL` is unset.
pub const DEFAULT_EXECUTOR_BASE_URL: &str = "http://localhost:3001/";
/// Default base URL of the health-report API.
pub const DEFAULT_HEALTH_BASE_URL: &str = "http://localhost:3000/";
/// Default CDN used to derive module import URLs.
pub const DEFAULT_MODULE_CDN_BASE_URL: &str = "https://esm.sh/";

const DEFAULT_DESCRIBE_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_EXECUTE_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable names consulted by [`LoaderConfig::from_env`].
pub mod keys {
    /// Executor service base URL.
    pub const EXECUTOR_BASE_URL: &str = "EXECUTOR_BASE_URL";
    /// Legacy name for the executor base URL.
    pub const RAILWAY_EXECUTOR_URL: &str = "RAILWAY_EXECUTOR_URL";
    /// Health-report API base URL.
    pub const HEALTH_API_BASE_URL: &str = "HEALTH_API_BASE_URL";
    /// Public app URL, used when no dedicated health URL is set.
    pub const NEXT_PUBLIC_APP_URL: &str = "NEXT_PUBLIC_APP_URL";
    /// CDN prefix for default module import URLs.
    pub const TOOL_MODULE_CDN_URL: &str = "TOOL_MODULE_CDN_URL";
    /// Describe call timeout in seconds.
    pub const TOOL_DESCRIBE_TIMEOUT_SECS: &str = "TOOL_DESCRIBE_TIMEOUT_SECS";
    /// Execute call timeout in seconds.
    pub const TOOL_EXECUTE_TIMEOUT_SECS: &str = "TOOL_EXECUTE_TIMEOUT_SECS";
    /// Health-report call timeout in seconds.
    pub const TOOL_HEALTH_TIMEOUT_SECS: &str = "TOOL_HEALTH_TIMEOUT_SECS";
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced while resolving configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A configured value failed validation.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// Setting or environment variable that was rejected.
        key: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Endpoints and timeouts used to reach the executor and health services.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLoaderConfig")]
pub struct LoaderConfig {
    executor_base_url: String,
    health_base_url: String,
    module_cdn_base_url: String,
    describe_timeout: Duration,
    execute_timeout: Duration,
    health_timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            executor_base_url: DEFAULT_EXECUTOR_BASE_URL.to_owned(),
            health_base_url: DEFAULT_HEALTH_BASE_URL.to_owned(),
            module_cdn_base_url: DEFAULT_MODULE_CDN_BASE_URL.to_owned(),
            describe_timeout: DEFAULT_DESCRIBE_TIMEOUT,
            execute_timeout: DEFAULT_EXECUTE_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

impl LoaderConfig {
    /// Resolves configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable is set to an invalid
    /// URL or timeout.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup.
    ///
    /// Unset or blank variables fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(url) = get(keys::EXECUTOR_BASE_URL).or_else(|| get(keys::RAILWAY_EXECUTOR_URL))
        {
            config = config.with_executor_base_url(&url)?;
        }
        if let Some(url) = get(keys::HEALTH_API_BASE_URL).or_else(|| get(keys::NEXT_PUBLIC_APP_URL))
        {
            config = config.with_health_base_url(&url)?;
        }
        if let Some(url) = get(keys::TOOL_MODULE_CDN_URL) {
            config = config.with_module_cdn_base_url(&url)?;
        }
        if let Some(secs) = get(keys::TOOL_DESCRIBE_TIMEOUT_SECS) {
            config.describe_timeout = parse_secs(keys::TOOL_DESCRIBE_TIMEOUT_SECS, &secs)?;
        }
        if let Some(secs) = get(keys::TOOL_EXECUTE_TIMEOUT_SECS) {
            config.execute_timeout = parse_secs(keys::TOOL_EXECUTE_TIMEOUT_SECS, &secs)?;
        }
        if let Some(secs) = get(keys::TOOL_HEALTH_TIMEOUT_SECS) {
            config.health_timeout = parse_secs(keys::TOOL_HEALTH_TIMEOUT_SECS, &secs)?;
        }

        debug!(
            executor = %config.executor_base_url,
            health = %config.health_base_url,
            "resolved tool loader configuration"
        );
        Ok(config)
    }

    /// Overrides the executor base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the URL lacks an `http(s)://` scheme.
    pub fn with_executor_base_url(mut self, url: &str) -> ConfigResult<Self> {
        self.executor_base_url = sanitize_base_url(keys::EXECUTOR_BASE_URL, url)?;
        Ok(self)
    }

    /// Overrides the health-report API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the URL lacks an `http(s)://` scheme.
    pub fn with_health_base_url(mut self, url: &str) -> ConfigResult<Self> {
        self.health_base_url = sanitize_base_url(keys::HEALTH_API_BASE_URL, url)?;
        Ok(self)
    }

    /// Overrides the CDN prefix used for default import URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the URL lacks an `http(s)://` scheme.
    pub fn with_module_cdn_base_url(mut self, url: &str) -> ConfigResult<Self> {
        self.module_cdn_base_url = sanitize_base_url(keys::TOOL_MODULE_CDN_URL, url)?;
        Ok(self)
    }

    /// Sets the bounded wait for describe calls.
    #[must_use]
    pub fn with_describe_timeout(mut self, timeout: Duration) -> Self {
        self.describe_timeout = timeout;
        self
    }

    /// Sets the bounded wait for execute calls.
    #[must_use]
    pub fn with_execute_timeout(mut self, timeout: Duration) -> Self {
        self.execute_timeout = timeout;
        self
    }

    /// Sets the bounded wait for health-report calls.
    #[must_use]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Executor base URL, always ending in `/`.
    #[must_use]
    pub fn executor_base_url(&self) -> &str {
        &self.executor_base_url
    }

    /// Health-report API base URL, always ending in `/`.
    #[must_use]
    pub fn health_base_url(&self) -> &str {
        &self.health_base_url
    }

    /// CDN prefix for default import URLs, always ending in `/`.
    #[must_use]
    pub fn module_cdn_base_url(&self) -> &str {
        &self.module_cdn_base_url
    }

    /// Returns the describe timeout.
    #[must_use]
    pub const fn describe_timeout(&self) -> Duration {
        self.describe_timeout
    }

    /// Returns the execute timeout.
    #[must_use]
    pub const fn execute_timeout(&self) -> Duration {
        self.execute_timeout
    }

    /// Returns the health-report timeout.
    #[must_use]
    pub const fn health_timeout(&self) -> Duration {
        self.health_timeout
    }

    /// Derives the module URL for a package when the caller supplies none.
    #[must_use]
    pub fn default_import_url(&self, package_name: &str, version: &str) -> String {
        format!("{}{package_name}@{version}", self.module_cdn_base_url)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLoaderConfig {
    #[serde(default)]
    executor_base_url: Option<String>,
    #[serde(default)]
    health_base_url: Option<String>,
    #[serde(default)]
    module_cdn_base_url: Option<String>,
    #[serde(default)]
    describe_timeout_secs: Option<u64>,
    #[serde(default)]
    execute_timeout_secs: Option<u64>,
    #[serde(default)]
    health_timeout_secs: Option<u64>,
}

impl TryFrom<RawLoaderConfig> for LoaderConfig {
    type Error = ConfigError;

    fn try_from(raw: RawLoaderConfig) -> ConfigResult<Self> {
        let mut config = Self::default();
        if let Some(url) = raw.executor_base_url {
            config = config.with_executor_base_url(&url)?;
        }
        if let Some(url) = raw.health_base_url {
            config = config.with_health_base_url(&url)?;
        }
        if let Some(url) = raw.module_cdn_base_url {
            config = config.with_module_cdn_base_url(&url)?;
        }
        if let Some(secs) = raw.describe_timeout_secs {
            config.describe_timeout = nonzero_secs("describeTimeoutSecs", secs)?;
        }
        if let Some(secs) = raw.execute_timeout_secs {
            config.execute_timeout = nonzero_secs("executeTimeoutSecs", secs)?;
        }
        if let Some(secs) = raw.health_timeout_secs {
            config.health_timeout = nonzero_secs("healthTimeoutSecs", secs)?;
        }
        Ok(config)
    }
}

fn sanitize_base_url(key: &str, input: &str) -> ConfigResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::invalid(
            key,
            "base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(base)
}

fn parse_secs(key: &str, value: &str) -> ConfigResult<Duration> {
    let secs = value
        .parse::<u64>()
        .map_err(|err| ConfigError::invalid(key, format!("expected whole seconds: {err}")))?;
    nonzero_secs(key, secs)
}

fn nonzero_secs(key: &str, secs: u64) -> ConfigResult<Duration> {
    if secs == 0 {
        return Err(ConfigError::invalid(key, "timeout must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}
