//! HTTP transport seam.
//!
//! Endpoint implementations describe each remote call as an [`ApiRequest`]
//! and hand it to a [`Transport`]. [`HttpTransport`] is the production
//! implementation over `reqwest`; tests may substitute their own.

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};

/// Header carrying a per-request correlation id.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Upper bound on how much of an error body is buffered from a stream.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// A JSON document.
    Json(serde_json::Value),
    /// Opaque bytes forwarded verbatim.
    Raw {
        /// Payload.
        bytes: Bytes,
        /// `Content-Type` header value.
        content_type: String,
    },
}

/// A transport-neutral description of one remote call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path segments appended to the base URL, unencoded.
    pub segments: Vec<String>,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Extra headers.
    pub headers: HeaderMap,
    /// Optional body.
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    /// Creates a request without query, headers or body.
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds `force=true` when `force` is set.
    #[must_use]
    pub fn with_force(self, force: bool) -> Self {
        if force { self.with_query("force", "true") } else { self }
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if `body` cannot be serialized.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Sets an opaque body.
    #[must_use]
    pub fn with_raw(mut self, bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Raw {
            bytes: bytes.into(),
            content_type: content_type.into(),
        });
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The relative path, for logging.
    #[must_use]
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Creates a response with no headers.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as lossy UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A response whose body arrives incrementally.
pub struct StreamingResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body chunks in arrival order.
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl StreamingResponse {
    /// Buffers the body, keeping at most the first 64 KiB.
    ///
    /// Used for error bodies, which are small; the rest is discarded.
    pub async fn into_raw(mut self) -> Result<RawResponse> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            let chunk = chunk?;
            let room = MAX_ERROR_BODY.saturating_sub(buffer.len());
            buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if buffer.len() >= MAX_ERROR_BODY {
                break;
            }
        }
        Ok(RawResponse {
            status: self.status,
            headers: self.headers,
            body: buffer.freeze(),
        })
    }
}

/// A decoded result together with the response it came from.
///
/// `raw` is `None` when no HTTP exchange took place, e.g. for the in-memory
/// platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    /// Decoded body.
    pub body: T,
    /// The raw response.
    pub raw: Option<RawResponse>,
}

impl<T> Response<T> {
    /// Pairs a body with its raw response.
    #[must_use]
    pub const fn new(body: T, raw: RawResponse) -> Self {
        Self {
            body,
            raw: Some(raw),
        }
    }

    /// Wraps a body that did not come from an HTTP exchange.
    #[must_use]
    pub const fn detached(body: T) -> Self {
        Self { body, raw: None }
    }

    /// Discards the raw response.
    pub fn into_body(self) -> T {
        self.body
    }

    /// HTTP status of the raw response, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.raw.as_ref().map(|r| r.status)
    }
}

/// Delivers [`ApiRequest`]s.
///
/// Implementations report delivery failures as [`ApiError::Transport`] and
/// return non-2xx responses as ordinary values; classification happens in
/// the client.
pub trait Transport: Send + Sync + 'static {
    /// Sends a request and buffers the whole response.
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<RawResponse>> + Send;

    /// Sends a request and returns as soon as the response head arrives.
    fn open_stream(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<StreamingResponse>> + Send;
}

/// [`Transport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Builds a transport from the client configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// Resolves the absolute URL of a request, percent-encoding segments.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidConfig`] if the base URL cannot take path
    /// segments.
    pub fn url(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ApiError::InvalidConfig(format!("API URL '{}' cannot be a base", self.base_url))
            })?;
            segments.pop_if_empty();
            segments.extend(&request.segments);
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    fn build(&self, request: ApiRequest) -> Result<(reqwest::RequestBuilder, String)> {
        let url = self.url(&request)?;
        let request_id = Uuid::new_v4().to_string();

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers)
            .header(HEADER_REQUEST_ID, &request_id);

        builder = match request.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Raw {
                bytes,
                content_type,
            }) => builder.header(CONTENT_TYPE, content_type).body(bytes),
        };

        Ok((builder, request_id))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        let method = request.method.clone();
        let path = request.path();
        let (builder, request_id) = self.build(request)?;

        trace!(%method, %path, %request_id, "sending request");
        let response = builder.timeout(self.request_timeout).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!(%method, %path, %request_id, status = status.as_u16(), bytes = body.len(), "request completed");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    async fn open_stream(&self, request: ApiRequest) -> Result<StreamingResponse> {
        let method = request.method.clone();
        let path = request.path();
        let (builder, request_id) = self.build(request)?;

        trace!(%method, %path, %request_id, "opening stream");
        let response = tokio::time::timeout(self.request_timeout, builder.send())
            .await
            .map_err(|_| {
                ApiError::Transport(format!(
                    "no response for {path} within {}s",
                    self.request_timeout.as_secs()
                ))
            })??;
        let status = response.status();
        debug!(%method, %path, %request_id, status = status.as_u16(), "stream opened");

        Ok(StreamingResponse {
            status,
            headers: response.headers().clone(),
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(ApiError::from))
                .boxed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(&ClientConfig::new(base).unwrap()).unwrap()
    }

    #[test]
    fn url_appends_segments_to_base_path() {
        let t = transport("https://api.skiff.example/v1");
        let request = ApiRequest::new(Method::GET, ["projects", "letschat", "services"]);
        assert_eq!(
            t.url(&request).unwrap().as_str(),
            "https://api.skiff.example/v1/projects/letschat/services"
        );
    }

    #[test]
    fn url_encodes_segments_and_query() {
        let t = transport("http://localhost:8080/");
        let request = ApiRequest::new(Method::DELETE, ["projects", "a b/c"]).with_force(true);
        assert_eq!(
            t.url(&request).unwrap().as_str(),
            "http://localhost:8080/projects/a%20b%2Fc?force=true"
        );
    }

    #[test]
    fn with_force_false_adds_nothing() {
        let request = ApiRequest::new(Method::DELETE, ["projects", "x"]).with_force(false);
        assert!(request.query.is_empty());
    }

    #[test]
    fn json_body_is_captured() {
        let request = ApiRequest::new(Method::PATCH, ["projects"])
            .with_json(&serde_json::json!({"instances": 3}))
            .unwrap();
        assert_eq!(
            request.body,
            Some(RequestBody::Json(serde_json::json!({"instances": 3})))
        );
        assert_eq!(request.path(), "projects");
    }

    #[test]
    fn raw_text_is_lossy_utf8() {
        let raw = RawResponse::new(StatusCode::BAD_GATEWAY, &b"upstream \xff down"[..]);
        assert!(!raw.is_success());
        assert_eq!(raw.text(), "upstream \u{fffd} down");
    }

    #[test]
    fn response_detached_has_no_status() {
        let response = Response::detached(5);
        assert!(response.status().is_none());
        assert_eq!(response.into_body(), 5);
    }

    #[tokio::test]
    async fn into_raw_caps_body() {
        let chunk = Bytes::from(vec![b'x'; MAX_ERROR_BODY]);
        let streaming = StreamingResponse {
            status: StatusCode::BAD_GATEWAY,
            headers: HeaderMap::new(),
            body: stream::iter(vec![Ok(chunk.clone()), Ok(chunk)]).boxed(),
        };
        let raw = streaming.into_raw().await.unwrap();
        assert_eq!(raw.body.len(), MAX_ERROR_BODY);
        assert_eq!(raw.status, StatusCode::BAD_GATEWAY);
    }
}
