//! App command implementation.
//!
//! Apps are addressed as `<project>/<service>/<app>`; shorter addresses are
//! rejected before any request is made.

use std::io::Write;

use skiff_api::Apps;
use tracing::debug;

use super::app_address;
use crate::cli::AppCommands;
use crate::error::CliError;
use crate::output::OutputFormat;

/// App command executor.
pub struct AppCommand<'a, A> {
    api: &'a A,
}

impl<'a, A: Apps> AppCommand<'a, A> {
    /// Create a new app command.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Execute an app subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is malformed, the API call fails or
    /// writing the output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &AppCommands,
    ) -> Result<(), CliError> {
        match command {
            AppCommands::Show { path } => {
                let (p, s, a) = app_address(path)?;
                let app = Apps::get(self.api, p, s, a).await?.into_body();
                format.write(writer, &app)?;
            }
            AppCommands::Scale { path, instances } => {
                let (p, s, a) = app_address(path)?;
                debug!(app = %path, instances, "scaling app");
                let app = Apps::scale(self.api, p, s, a, *instances).await?.into_body();
                format.write(writer, &app)?;
            }
            AppCommands::Restart { path } => {
                let (p, s, a) = app_address(path)?;
                let status = Apps::restart(self.api, p, s, a).await?.into_body();
                format.write(writer, &status)?;
            }
            AppCommands::Rollback { path, version } => {
                let (p, s, a) = app_address(path)?;
                debug!(app = %path, version, "rolling back app");
                let app = Apps::rollback(self.api, p, s, a, version).await?.into_body();
                format.write(writer, &app)?;
            }
            AppCommands::Delete { path, force } => {
                let (p, s, a) = app_address(path)?;
                let status = Apps::delete(self.api, p, s, a, *force).await?.into_body();
                format.write(writer, &status)?;
            }
            AppCommands::Metrics { path } => {
                let (p, s, a) = app_address(path)?;
                let metrics = Apps::get_metrics(self.api, p, s, a).await?.into_body();
                format.write(writer, &metrics)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Format, ResourcePath};
    use skiff_api::InMemoryPlatform;

    fn node() -> ResourcePath {
        "letschat/frontend/node".parse().unwrap()
    }

    async fn run(
        platform: &InMemoryPlatform,
        format: Format,
        command: AppCommands,
    ) -> Result<String, CliError> {
        let mut buf = Vec::new();
        AppCommand::new(platform)
            .execute(&mut buf, &OutputFormat::new(format), &command)
            .await?;
        Ok(String::from_utf8(buf).unwrap())
    }

    // ==================== Address checks ====================

    #[tokio::test]
    async fn scale_rejects_service_address() {
        let err = run(
            &InMemoryPlatform::lets_chat(),
            Format::Table,
            AppCommands::Scale { path: "letschat/frontend".parse().unwrap(), instances: 3 },
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    // ==================== Lifecycle ====================

    #[tokio::test]
    async fn scale_updates_instances() {
        let platform = InMemoryPlatform::lets_chat();
        let out = run(
            &platform,
            Format::Json,
            AppCommands::Scale { path: node(), instances: 4 },
        )
        .await
        .unwrap();

        let app: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(app["instances"], 4);
        assert_eq!(platform.projects()[0].services[0].apps[0].instances, Some(4));
    }

    #[tokio::test]
    async fn restart_prints_message() {
        let out = run(
            &InMemoryPlatform::lets_chat(),
            Format::Table,
            AppCommands::Restart { path: node() },
        )
        .await
        .unwrap();
        assert_eq!(out, "Restarting app.\n");
    }

    #[tokio::test]
    async fn rollback_to_unknown_version_is_not_found() {
        let err = run(
            &InMemoryPlatform::lets_chat(),
            Format::Table,
            AppCommands::Rollback { path: node(), version: "1999-01-01T00:00:00.000Z".into() },
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn rollback_to_known_version() {
        let out = run(
            &InMemoryPlatform::lets_chat(),
            Format::Table,
            AppCommands::Rollback { path: node(), version: "2015-12-20T08:01:12.532Z".into() },
        )
        .await
        .unwrap();
        assert!(out.contains("Version:    2015-12-20T08:01:12.532Z"));
    }

    #[tokio::test]
    async fn metrics_table_lists_instances() {
        let out = run(
            &InMemoryPlatform::lets_chat(),
            Format::Table,
            AppCommands::Metrics { path: node() },
        )
        .await
        .unwrap();
        assert!(out.contains("skiff-letschat_frontend_node.0"));
    }
}
