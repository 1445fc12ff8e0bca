//! Error model for platform API operations.
//!
//! Every operation returns [`Result<T>`]. Callers branch on
//! [`ApiError::kind`] and [`ApiError::status_code`] rather than on message
//! text:
//!
//! - [`ErrorKind::Validation`]: malformed input rejected locally, or a
//!   `400`/`422` from the server
//! - [`ErrorKind::NotFound`]: some segment of the resource path did not resolve
//! - [`ErrorKind::Authentication`]: the [`ApiError::MissingAccessToken`]
//!   sentinel, or a `401` from the server
//! - [`ErrorKind::Transport`]: network, decoding or local I/O failures
//! - [`ErrorKind::Remote`]: any other non-2xx answer

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{ResourceKind, StatusResponse};
use crate::validation::ValidationError;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input.
    Validation,
    /// The requested resource does not exist.
    NotFound,
    /// Missing or rejected access token.
    Authentication,
    /// Network, decoding or I/O failure.
    Transport,
    /// Any other failure reported by the server.
    Remote,
}

impl ErrorKind {
    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Authentication => "authentication",
            Self::Transport => "transport",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-2xx answer from the platform.
///
/// Carries the HTTP status, the `{status, message}` envelope and an optional
/// machine-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// HTTP status code of the response.
    pub status_code: StatusCode,
    /// HTTP status text, e.g. `Not Found`.
    pub status_text: String,
    /// The `{status: "error", message}` envelope.
    pub envelope: StatusResponse,
    /// Optional reason string intended for scripting.
    pub reason: Option<String>,
}

/// Shape of an error body on the wire. Every field is optional because
/// proxies in front of the API may answer with arbitrary bodies.
#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl ErrorResponse {
    /// Creates an error response with the canonical status text.
    #[must_use]
    pub fn new(status_code: StatusCode, message: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            status_code,
            status_text: canonical_text(status_code),
            envelope: StatusResponse::error(message),
            reason,
        }
    }

    /// Creates the `404` produced when a resource path segment does not resolve.
    ///
    /// The message names the resource the caller asked for, e.g.
    /// `Service with id "frontend" could not be found`.
    #[must_use]
    pub fn not_found(kind: ResourceKind, id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{kind} with id \"{id}\" could not be found"),
            None,
        )
    }

    /// Builds an error response from a raw status and body.
    ///
    /// The body is parsed as a `{status, message, reason}` envelope. When it
    /// is not one, the trimmed body text becomes the message, and an empty
    /// body falls back to the status text.
    #[must_use]
    pub fn from_body(status_code: StatusCode, body: &[u8]) -> Self {
        let status_text = canonical_text(status_code);

        if let Ok(WireError {
            status,
            message: Some(message),
            reason,
        }) = serde_json::from_slice::<WireError>(body)
        {
            return Self {
                status_code,
                status_text,
                envelope: StatusResponse {
                    status: status.unwrap_or_else(|| "error".to_string()),
                    message,
                },
                reason: reason.filter(|r| !r.is_empty()),
            };
        }

        let text = String::from_utf8_lossy(body).trim().to_string();
        let message = if text.is_empty() {
            format!("request failed with status {}", status_code.as_u16())
        } else {
            text
        };

        Self {
            status_code,
            status_text,
            envelope: StatusResponse::error(message),
            reason: None,
        }
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.envelope.message
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.status_code.as_u16(),
            self.status_text,
            self.envelope.message
        )?;
        if let Some(reason) = &self.reason {
            write!(f, " (reason: {reason})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorResponse {}

/// Errors returned by every endpoint operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No access token is configured. Returned before any request is sent.
    #[error("missing access token")]
    MissingAccessToken,

    /// The payload or an argument failed local validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server answered with a non-2xx status.
    #[error("{0}")]
    Remote(ErrorResponse),

    /// The request could not be delivered or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Reading a caller-supplied byte stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingAccessToken => ErrorKind::Authentication,
            Self::Validation(_) | Self::InvalidConfig(_) => ErrorKind::Validation,
            Self::Remote(response) => match response.status_code {
                StatusCode::NOT_FOUND => ErrorKind::NotFound,
                StatusCode::UNAUTHORIZED => ErrorKind::Authentication,
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    ErrorKind::Validation
                }
                _ => ErrorKind::Remote,
            },
            Self::Transport(_) | Self::Decode(_) | Self::Io(_) => ErrorKind::Transport,
        }
    }

    /// HTTP status of a remote failure. Local failures have none.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Remote(response) => Some(response.status_code),
            _ => None,
        }
    }

    /// Machine-readable reason reported by the server, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Remote(response) => response.reason.as_deref(),
            _ => None,
        }
    }

    /// The remote error envelope, if this is a remote failure.
    #[must_use]
    pub const fn error_response(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Remote(response) => Some(response),
            _ => None,
        }
    }

    /// Human-readable message without the status prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Remote(response) => response.message().to_string(),
            other => other.to_string(),
        }
    }

    /// Returns true for the missing-token sentinel.
    #[must_use]
    pub const fn is_missing_access_token(&self) -> bool {
        matches!(self, Self::MissingAccessToken)
    }

    /// Returns true for not-found failures.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Shorthand for a remote not-found failure.
    #[must_use]
    pub fn not_found(kind: ResourceKind, id: &str) -> Self {
        Self::Remote(ErrorResponse::not_found(kind, id))
    }
}

impl From<ErrorResponse> for ApiError {
    fn from(response: ErrorResponse) -> Self {
        Self::Remote(response)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(error_chain(&err))
    }
}

/// Joins an error and its sources; reqwest hides the interesting part
/// (connection refused, DNS failure) in the source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}

fn canonical_text(status_code: StatusCode) -> String {
    status_code
        .canonical_reason()
        .unwrap_or("Unknown Status")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ValidationError, Violation, ViolationKind};
    use test_case::test_case;

    #[test]
    fn not_found_names_the_resource() {
        let err = ErrorResponse::not_found(ResourceKind::Project, "ghost");
        assert_eq!(err.status_code, StatusCode::NOT_FOUND);
        assert_eq!(err.status_text, "Not Found");
        assert_eq!(err.envelope.status, "error");
        assert_eq!(err.message(), "Project with id \"ghost\" could not be found");
    }

    #[test]
    fn display_includes_status_and_reason() {
        let err = ErrorResponse::new(
            StatusCode::CONFLICT,
            "deployment in progress",
            Some("locked".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "409 Conflict: deployment in progress (reason: locked)"
        );
    }

    #[test]
    fn from_body_parses_envelope() {
        let body = br#"{"status":"error","message":"App with id \"node\" could not be found","reason":"missing"}"#;
        let err = ErrorResponse::from_body(StatusCode::NOT_FOUND, body);
        assert_eq!(err.message(), "App with id \"node\" could not be found");
        assert_eq!(err.reason.as_deref(), Some("missing"));
    }

    #[test]
    fn from_body_falls_back_to_text() {
        let err = ErrorResponse::from_body(StatusCode::BAD_GATEWAY, b"  upstream down \n");
        assert_eq!(err.message(), "upstream down");
        assert!(err.reason.is_none());
    }

    #[test]
    fn from_body_empty_uses_status() {
        let err = ErrorResponse::from_body(StatusCode::SERVICE_UNAVAILABLE, b"");
        assert_eq!(err.message(), "request failed with status 503");
    }

    #[test]
    fn from_body_json_without_message_is_text() {
        let err = ErrorResponse::from_body(StatusCode::BAD_REQUEST, br#"{"error":"nope"}"#);
        assert_eq!(err.message(), r#"{"error":"nope"}"#);
    }

    #[test_case(StatusCode::NOT_FOUND, ErrorKind::NotFound ; "not found")]
    #[test_case(StatusCode::UNAUTHORIZED, ErrorKind::Authentication ; "unauthorized")]
    #[test_case(StatusCode::BAD_REQUEST, ErrorKind::Validation ; "bad request")]
    #[test_case(StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::Validation ; "unprocessable")]
    #[test_case(StatusCode::CONFLICT, ErrorKind::Remote ; "conflict")]
    #[test_case(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Remote ; "server error")]
    fn remote_kind_follows_status(status: StatusCode, expected: ErrorKind) {
        let err = ApiError::Remote(ErrorResponse::new(status, "x", None));
        assert_eq!(err.kind(), expected);
        assert_eq!(err.status_code(), Some(status));
    }

    #[test]
    fn local_failures_carry_no_status() {
        let validation = ApiError::Validation(ValidationError::new(
            "app",
            vec![Violation::new("id", ViolationKind::Empty)],
        ));
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert!(validation.status_code().is_none());

        let sentinel = ApiError::MissingAccessToken;
        assert_eq!(sentinel.kind(), ErrorKind::Authentication);
        assert!(sentinel.is_missing_access_token());
        assert!(sentinel.status_code().is_none());

        let transport = ApiError::Transport("connection refused".into());
        assert_eq!(transport.kind(), ErrorKind::Transport);
        assert!(transport.status_code().is_none());
    }

    #[test]
    fn remote_accessors_expose_envelope_and_reason() {
        let err = ApiError::from(ErrorResponse::from_body(
            StatusCode::CONFLICT,
            br#"{"status":"error","message":"deployment in progress","reason":"locked"}"#,
        ));
        assert_eq!(err.reason(), Some("locked"));
        let response = err.error_response().unwrap();
        assert_eq!(response.status_text, "Conflict");
        assert_eq!(response.message(), "deployment in progress");

        let local = ApiError::MissingAccessToken;
        assert!(local.reason().is_none());
        assert!(local.error_response().is_none());
    }

    #[test]
    fn remote_unauthorized_is_not_the_sentinel() {
        let err = ApiError::Remote(ErrorResponse::new(StatusCode::UNAUTHORIZED, "expired", None));
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(!err.is_missing_access_token());
    }

    #[test]
    fn message_strips_status_prefix() {
        let err = ApiError::not_found(ResourceKind::App, "node");
        assert_eq!(err.message(), "App with id \"node\" could not be found");
        assert!(err.to_string().starts_with("404 Not Found: "));
        assert!(err.is_not_found());
    }

    #[test]
    fn decode_and_io_are_transport() {
        let decode: ApiError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(decode.kind(), ErrorKind::Transport);

        let io: ApiError = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof").into();
        assert_eq!(io.kind(), ErrorKind::Transport);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<ApiError>();
    }
}
