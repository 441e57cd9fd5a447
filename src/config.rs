//! Client configuration.

use std::time::Duration;

use log::debug;
use reqwest::Url;

use crate::error::{Error, Result};
use crate::http::MAX_RETRIES;
use crate::runtime::Runtime;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_URL: &str = "SYMBIO_KB_URL";
pub const ENV_API_KEY: &str = "SYMBIO_KB_API_KEY";
pub const ENV_TIMEOUT: &str = "SYMBIO_KB_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "SYMBIO_KB_MAX_RETRIES";

/// Connection settings for a knowledge-base instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service root without trailing slashes, e.g. `https://kb.example.com`.
    pub base_url: String,
    /// Bearer token: an `skb_live_...` API key or a session JWT.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries allowed after an HTTP 429 response.
    pub max_retries: usize,
}

impl ClientConfig {
    /// Creates a config with the default timeout and retry budget.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("API key must not be empty".to_string()));
        }

        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Reads `SYMBIO_KB_URL`, `SYMBIO_KB_API_KEY`, `SYMBIO_KB_TIMEOUT` and
    /// `SYMBIO_KB_MAX_RETRIES`. Only the API key is required.
    #[tracing::instrument(skip(runtime))]
    pub fn from_env<R: Runtime>(runtime: &R) -> Result<Self> {
        let base_url = runtime
            .env_var(ENV_URL)
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let api_key = runtime
            .env_var(ENV_API_KEY)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_API_KEY)))?;

        let mut config = Self::new(&base_url, &api_key)?;

        if let Ok(value) = runtime.env_var(ENV_TIMEOUT) {
            let secs = value.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT, value))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        if let Ok(value) = runtime.env_var(ENV_MAX_RETRIES) {
            let retries = value.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!("{} must be a whole number, got '{}'", ENV_MAX_RETRIES, value))
            })?;
            config = config.with_max_retries(retries);
        }

        debug!(
            "Loaded config from environment: url={}, timeout={:?}, max_retries={}",
            config.base_url, config.timeout, config.max_retries
        );
        Ok(config)
    }

    /// The API key with its middle masked, safe for logs.
    pub fn redacted_api_key(&self) -> String {
        redact(&self.api_key)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.redacted_api_key())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn normalize_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::Config(format!(
            "Base URL must use http or https, got '{}'",
            url.scheme()
        )));
    }

    Ok(trimmed.to_string())
}

fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < 12 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}
