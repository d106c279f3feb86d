//! Configuration types for flowq

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default path for saved query templates
pub const DEFAULT_TEMPLATE_PATH: &str = "flow_query.json";

/// Remote analytics service settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the analytics service, e.g. `https://sna.example.com`
    #[serde(default)]
    pub base_url: String,

    /// Tenant (domain) identifier the query runs under
    #[serde(default)]
    pub tenant: String,

    /// Accept self-signed or otherwise untrusted TLS certificates (default: false)
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

/// Status polling behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status polls (default: 1 second)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Give up if the query has not completed after this long (default: 30 minutes)
    #[serde(default = "default_poll_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            timeout: default_poll_timeout(),
        }
    }
}

/// Retry configuration for transient failures while polling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for a flowq run
///
/// Loaded from an optional JSON file and then overridden by command line flags.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analytics service connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Status polling settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Retry settings for transient poll failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("invalid JSON in {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.trim();
        if base.is_empty() {
            return Err(Error::config("base URL is required", "base_url"));
        }
        let parsed = url::Url::parse(base)
            .map_err(|e| Error::config(format!("invalid base URL {base:?}: {e}"), "base_url"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(
                format!("base URL must use http or https, got {}", parsed.scheme()),
                "base_url",
            ));
        }
        if self.api.tenant.trim().is_empty() {
            return Err(Error::config("tenant identifier is required", "tenant"));
        }
        if self.poll.interval.is_zero() {
            return Err(Error::config(
                "poll interval must be greater than zero",
                "poll.interval",
            ));
        }
        if self.poll.timeout < self.poll.interval {
            return Err(Error::config(
                "poll timeout must be at least one poll interval",
                "poll.timeout",
            ));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::config(
                format!("backoff multiplier must be a finite number >= 1.0, got {multiplier}"),
                "retry.backoff_multiplier",
            ));
        }
        if self.retry.max_delay < self.retry.initial_delay {
            return Err(Error::config(
                "retry max_delay must be at least initial_delay",
                "retry.max_delay",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
