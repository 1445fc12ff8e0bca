//! CLI command implementations.
//!
//! Each submodule drives one resource through its endpoint trait, so the
//! same code runs against the HTTP client and the in-memory platform:
//! - [`project`] - Project listing, inspection and deletion
//! - [`service`] - Service inspection and deletion
//! - [`app`] - App lifecycle (scale, restart, rollback, metrics)
//! - [`logs`] - Log streaming at any depth
//! - [`registry`] - Registry credentials

pub mod app;
pub mod logs;
pub mod project;
pub mod registry;
pub mod service;

pub use app::AppCommand;
pub use logs::LogsCommand;
pub use project::ProjectCommand;
pub use registry::RegistryCommand;
pub use service::ServiceCommand;

use crate::cli::ResourcePath;
use crate::error::CliError;

/// Splits a `<project>/<service>` address.
pub(crate) fn service_address(path: &ResourcePath) -> Result<(&str, &str), CliError> {
    match (&path.service, &path.app) {
        (Some(service), None) => Ok((&path.project, service)),
        _ => Err(CliError::InvalidArgument(format!(
            "expected <project>/<service>, got '{path}'"
        ))),
    }
}

/// Splits a `<project>/<service>/<app>` address.
pub(crate) fn app_address(path: &ResourcePath) -> Result<(&str, &str, &str), CliError> {
    match (&path.service, &path.app) {
        (Some(service), Some(app)) => Ok((&path.project, service, app)),
        _ => Err(CliError::InvalidArgument(format!(
            "expected <project>/<service>/<app>, got '{path}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ResourcePath {
        s.parse().unwrap()
    }

    #[test]
    fn service_address_requires_two_segments() {
        assert_eq!(
            service_address(&path("letschat/frontend")).unwrap(),
            ("letschat", "frontend")
        );
        assert!(service_address(&path("letschat")).is_err());
        assert!(service_address(&path("letschat/frontend/node")).is_err());
    }

    #[test]
    fn app_address_requires_three_segments() {
        assert_eq!(
            app_address(&path("letschat/frontend/node")).unwrap(),
            ("letschat", "frontend", "node")
        );
        let err = app_address(&path("letschat/frontend")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
