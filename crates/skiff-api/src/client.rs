//! Authenticated API client.
//!
//! [`Client`] implements every endpoint contract in
//! [`endpoints`](crate::endpoints) on top of a [`Transport`]. It owns the
//! configuration and clock; each call attaches the bearer token, sends one
//! request and classifies the answer.

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::clock::{SharedClock, SystemClock};
use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorResponse, Result};
use crate::logs::{self, LINES_PARAM, LogScope, LogStream, ProducerOptions};
use crate::transport::{ApiRequest, HttpTransport, RawResponse, Response, Transport};
use crate::validation::validate_path;

/// Platform API client.
pub struct Client<T: Transport = HttpTransport> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    clock: SharedClock,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Client<HttpTransport> {
    /// Creates a client that talks HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Creates an HTTP client from `SKIFF_*` environment variables.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration values.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client over an arbitrary transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used to timestamp log entries lacking one.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Attaches the bearer token, or fails with the missing-token sentinel.
    pub(crate) fn authorize(&self, request: ApiRequest) -> Result<ApiRequest> {
        let Some(token) = self.config.access_token.as_deref() else {
            debug!(path = %request.path(), "no access token configured");
            return Err(ApiError::MissingAccessToken);
        };

        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ApiError::InvalidConfig("access token contains characters not allowed in a header".into())
        })?;
        value.set_sensitive(true);
        Ok(request.with_header(AUTHORIZATION, value))
    }

    /// Sends a request and turns non-2xx answers into [`ApiError::Remote`].
    pub(crate) async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
        let request = self.authorize(request)?;
        let method = request.method.clone();
        let path = request.path();

        let raw = self.transport.send(request).await?;
        if raw.is_success() {
            return Ok(raw);
        }

        let error = ErrorResponse::from_body(raw.status, &raw.body);
        warn!(%method, %path, status = raw.status.as_u16(), message = error.message(), "request rejected");
        Err(ApiError::Remote(error))
    }

    /// Sends a request and decodes a 2xx JSON body.
    pub(crate) async fn call<B: DeserializeOwned>(&self, request: ApiRequest) -> Result<Response<B>> {
        let raw = self.execute(request).await?;
        let body = serde_json::from_slice(&raw.body)?;
        Ok(Response::new(body, raw))
    }

    /// Starts a log producer for `scope`. Local failures come back as an
    /// already completed stream.
    pub(crate) fn stream_logs(&self, scope: LogScope, limit: usize) -> LogStream {
        if let Err(error) = validate_path(&scope.path()) {
            return LogStream::failed(error.into());
        }

        let mut request = ApiRequest::new(Method::GET, scope.segments());
        if limit > 0 {
            request = request.with_query(LINES_PARAM, limit.to_string());
        }
        let request = match self.authorize(request) {
            Ok(request) => request,
            Err(error) => return LogStream::failed(error),
        };

        logs::spawn(
            Arc::clone(&self.transport),
            request,
            scope,
            ProducerOptions {
                limit,
                idle_timeout: self.config.log_idle_timeout,
                clock: Arc::clone(&self.clock),
            },
        )
    }
}
