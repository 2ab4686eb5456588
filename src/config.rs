//! Client configuration loaded from the environment.
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file by `main`. The resulting `ClientConfig` is handed to the
//! transport at construction; nothing here is global.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "mts-prism.com";
pub const DEFAULT_PORT: u16 = 8082;

const GET_TIMEOUT: Duration = Duration::from_secs(10);
const POST_TIMEOUT: Duration = Duration::from_secs(15);

/// Bounded exponential backoff for transient HTTP failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay; retry `n` waits `backoff * 2^(n-1)`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(400),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given 1-based retry.
    pub fn delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1 << exp)
    }
}

#[derive(Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub api_code: String,
    pub retry: RetryPolicy,
    pub get_timeout: Duration,
    pub post_timeout: Duration,
}

// Keep the team credential out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_code", &"<redacted>")
            .field("retry", &self.retry)
            .field("get_timeout", &self.get_timeout)
            .field("post_timeout", &self.post_timeout)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, api_code: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            api_code: api_code.into(),
            retry: RetryPolicy::default(),
            get_timeout: GET_TIMEOUT,
            post_timeout: POST_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reads `URL`, `PORT` and `TEAM_API_CODE` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, but with an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_code = non_blank("TEAM_API_CODE").ok_or(ConfigError::MissingCredential)?;
        let host = non_blank("URL").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_blank("PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(p) if p > 0 => p,
                _ => return Err(ConfigError::InvalidPort(raw)),
            },
            None => DEFAULT_PORT,
        };

        Ok(Self::new(host, port, api_code))
    }

    /// `http://host:port`, unless `host` already names a scheme.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{}", self.port)
        } else {
            format!("http://{host}:{}", self.port)
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }
}
