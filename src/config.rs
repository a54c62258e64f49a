//! Client configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `UNREAL_SPEECH_*` environment variables. The [`SpeechClientBuilder`] applies
//! explicit overrides on top and validates the result.
//!
//! [`SpeechClientBuilder`]: crate::SpeechClientBuilder

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.v6.unrealspeech.com";

/// Fixed delay between two status queries of a synthesis task.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Maximum number of status queries before the poller gives up.
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 10;

pub const ENV_API_KEY: &str = "UNREAL_SPEECH_API_KEY";
pub const ENV_BASE_URL: &str = "UNREAL_SPEECH_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "UNREAL_SPEECH_HTTP_TIMEOUT_SECS";
pub const ENV_PROXY_URL: &str = "UNREAL_SPEECH_PROXY_URL";

/// Polling bound for synthesis tasks: `max_attempts` queries, `interval_ms` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Worst-case time spent sleeping before the poller gives up.
    pub fn max_wait(&self) -> Duration {
        self.interval() * self.max_attempts.saturating_sub(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::configuration_with_context(
                "poll.max_attempts must be at least 1",
                ErrorContext::new()
                    .with_field_path("poll.max_attempts")
                    .with_source("config"),
            ));
        }
        Ok(())
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// Connection and polling settings for a [`SpeechClient`](crate::SpeechClient).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
    pub proxy_url: Option<String>,
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            pool_max_idle_per_host: 32,
            pool_idle_timeout_secs: 90,
            proxy_url: None,
            poll: PollConfig::default(),
        }
    }
}

// Keep the bearer token out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("pool_idle_timeout_secs", &self.pool_idle_timeout_secs)
            .field("proxy_url", &self.proxy_url)
            .field("poll", &self.poll)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Defaults overlaid with `UNREAL_SPEECH_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = env::var(ENV_API_KEY) {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(url) = env::var(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(secs) = env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.timeout_secs = secs;
        }
        if let Ok(proxy) = env::var(ENV_PROXY_URL) {
            self.proxy_url = Some(proxy);
        }
        self
    }

    /// Check the settings and return the bearer token.
    pub fn validate(&self) -> Result<&str> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "API key required",
                    ErrorContext::new()
                        .with_field_path("api_key")
                        .with_details(format!("set it explicitly or via {}", ENV_API_KEY)),
                )
            })?;

        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(self.base_url.clone()),
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::configuration_with_context(
                "Base URL must use http or https",
                ErrorContext::new()
                    .with_field_path("base_url")
                    .with_details(self.base_url.clone()),
            ));
        }

        self.poll.validate()?;
        Ok(api_key)
    }
}
