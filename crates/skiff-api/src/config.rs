//! Client configuration.
//!
//! Values come from code via the `with_*` builders or from the environment
//! via [`ClientConfig::from_env`]:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `SKIFF_API_URL` | API base URL | [`DEFAULT_API_URL`] |
//! | `SKIFF_ACCESS_TOKEN` | Bearer token | none |
//! | `SKIFF_TIMEOUT_SECS` | Per-request timeout | 30 |

use std::time::Duration;

use url::Url;

use crate::error::{ApiError, Result};

/// Default API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.skiff.example/v1/";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum silence between two chunks of a log stream.
pub const DEFAULT_LOG_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the API base URL.
pub const ENV_API_URL: &str = "SKIFF_API_URL";

/// Environment variable holding the access token.
pub const ENV_ACCESS_TOKEN: &str = "SKIFF_ACCESS_TOKEN";

/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "SKIFF_TIMEOUT_SECS";

/// Settings shared by every endpoint call.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL; resource paths are appended to it.
    pub base_url: Url,
    /// Bearer token. Calls fail with the missing-token sentinel when unset.
    pub access_token: Option<String>,
    /// Timeout for a single non-streaming request.
    pub request_timeout: Duration,
    /// Maximum silence between two chunks of a log stream.
    pub log_idle_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("log_idle_timeout", &self.log_idle_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration for `base_url` with defaults elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidConfig`] if the URL does not parse or is not
    /// `http`/`https`.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            access_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            log_idle_timeout: DEFAULT_LOG_IDLE_TIMEOUT,
            user_agent: format!("skiff/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Builds a configuration from `SKIFF_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&url)?;

        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            config = config.with_access_token(token);
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ApiError::InvalidConfig(format!("{ENV_TIMEOUT_SECS} must be whole seconds, got '{raw}'"))
            })?;
            config = config.with_request_timeout(Duration::from_secs(secs))?;
        }

        Ok(config)
    }

    /// Sets the access token. Blank tokens count as unset.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = if token.trim().is_empty() {
            None
        } else {
            Some(token.trim().to_string())
        };
        self
    }

    /// Sets the per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidConfig`] for a zero timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ApiError::InvalidConfig("request timeout must be positive".into()));
        }
        self.request_timeout = timeout;
        Ok(self)
    }

    /// Sets the log stream idle timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidConfig`] for a zero timeout.
    pub fn with_log_idle_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ApiError::InvalidConfig("log idle timeout must be positive".into()));
        }
        self.log_idle_timeout = timeout;
        Ok(self)
    }

    /// Sets the `User-Agent`.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Parses a base URL, forcing a trailing slash so relative joins keep the
/// path prefix (`/v1/` + `projects`).
fn parse_base_url(input: &str) -> Result<Url> {
    let mut url = Url::parse(input.trim())
        .map_err(|err| ApiError::InvalidConfig(format!("invalid API URL '{input}': {err}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidConfig(format!(
            "API URL must start with http:// or https://, got '{input}'"
        )));
    }
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidConfig(format!("API URL '{input}' cannot be a base")));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
