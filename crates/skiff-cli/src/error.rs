//! CLI error types and exit codes.

use skiff_api::{ApiError, ErrorKind};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// An API operation failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An argument is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output formatting failed.
    #[error("format error: {0}")]
    Format(String),

    /// Writing output or reading input failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code: 2 validation, 3 not found, 4 authentication,
    /// 1 anything else.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Api(err) => match err.kind() {
                ErrorKind::Validation => 2,
                ErrorKind::NotFound => 3,
                ErrorKind::Authentication => 4,
                ErrorKind::Transport | ErrorKind::Remote => 1,
            },
            Self::InvalidArgument(_) => 2,
            Self::Format(_) | Self::Io(_) => 1,
        }
    }

    /// A follow-up suggestion for the user, if one applies.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Api(err) if err.is_missing_access_token() => {
                Some("pass --token or set SKIFF_ACCESS_TOKEN")
            }
            Self::Api(err) if err.kind() == ErrorKind::Authentication => {
                Some("the access token was rejected; request a new one")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skiff_api::ResourceKind;

    #[test]
    fn exit_codes_follow_error_kind() {
        assert_eq!(CliError::from(ApiError::MissingAccessToken).exit_code(), 4);
        assert_eq!(
            CliError::from(ApiError::not_found(ResourceKind::App, "node")).exit_code(),
            3
        );
        assert_eq!(CliError::from(ApiError::Transport("down".into())).exit_code(), 1);
        assert_eq!(CliError::InvalidArgument("x".into()).exit_code(), 2);
    }

    #[test]
    fn api_errors_display_transparently() {
        let err = CliError::from(ApiError::not_found(ResourceKind::Project, "ghost"));
        assert_eq!(
            err.to_string(),
            "404 Not Found: Project with id \"ghost\" could not be found"
        );
    }

    #[test]
    fn missing_token_has_hint() {
        let err = CliError::from(ApiError::MissingAccessToken);
        assert!(err.hint().is_some_and(|h| h.contains("--token")));
        assert!(CliError::InvalidArgument("x".into()).hint().is_none());
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert!(matches!(CliError::from(io_err), CliError::Io(_)));
    }
}
