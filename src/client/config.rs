//! Client configuration

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::HeaderValue;
use reqwest::Url;

use crate::error::GowaError;
use crate::middleware::RetryPolicy;

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const ENV_BASE_URL: &str = "GOWA_BASE_URL";
pub const ENV_USER: &str = "GOWA_USER";
pub const ENV_PASS: &str = "GOWA_PASS";
pub const ENV_TIMEOUT_SECS: &str = "GOWA_TIMEOUT_SECS";

/// Settings for one gateway instance.
///
/// Immutable once handed to a [`RequestExecutor`](super::RequestExecutor).
#[derive(Clone)]
pub struct GowaConfig {
    /// Gateway address. Any path prefix (e.g. `/api`) is kept when joining.
    pub base_url: String,
    /// Basic-Auth user; the header is sent when user or password is non-empty.
    pub username: String,
    pub password: String,
    /// Deadline for a whole exchange, retries included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Externally configured HTTP client; its connection pool is reused.
    pub http_client: Option<reqwest::Client>,
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for GowaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GowaConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("http_client", &self.http_client.as_ref().map(|_| ".."))
            .field("retry", &self.retry)
            .finish()
    }
}

impl Default for GowaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            http_client: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl GowaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load settings from `GOWA_BASE_URL`, `GOWA_USER`, `GOWA_PASS` and
    /// `GOWA_TIMEOUT_SECS`. Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns `GowaError::Config` if `GOWA_TIMEOUT_SECS` is not a number.
    pub fn from_env() -> Result<Self, GowaError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GowaError> {
        let mut config = Self::default();
        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url;
        }
        if let Some(username) = lookup(ENV_USER) {
            config.username = username;
        }
        if let Some(password) = lookup(ENV_PASS) {
            config.password = password;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                GowaError::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number, got: {raw}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Parse and check the base address.
    ///
    /// An empty address falls back to `http://localhost:3000`.
    ///
    /// # Errors
    /// Returns `GowaError::Config` unless the address is an absolute
    /// `http`/`https` URL usable as a base.
    pub fn parsed_base_url(&self) -> Result<Url, GowaError> {
        let raw = if self.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            self.base_url.trim()
        };

        let url = Url::parse(raw)
            .map_err(|e| GowaError::Config(format!("invalid base url {raw:?}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(GowaError::Config(format!(
                "base_url must use http:// or https://, got: {}",
                raw
            )));
        }
        if url.cannot_be_a_base() || url.host().is_none() {
            return Err(GowaError::Config(format!(
                "base_url must include a host, got: {}",
                raw
            )));
        }
        Ok(url)
    }

    /// The `Authorization` value for the configured credentials.
    ///
    /// `None` when both username and password are empty.
    pub fn basic_auth_header(&self) -> Result<Option<HeaderValue>, GowaError> {
        if self.username.is_empty() && self.password.is_empty() {
            return Ok(None);
        }
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|e| GowaError::Config(format!("invalid credentials header: {e}")))?;
        value.set_sensitive(true);
        Ok(Some(value))
    }
}
