//! # skiff-cli
//!
//! Skiff command-line interface.
//!
//! Provides commands for:
//! - Project, service and app inspection
//! - App lifecycle: scale, restart, rollback, delete
//! - Log streaming at project, service or app depth
//! - Registry credential management
//!
//! Commands are generic over the endpoint traits from `skiff-api`, so the
//! binary drives them with the HTTP [`Client`] while tests use the
//! in-memory platform.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

use std::io::Write;
use std::time::Duration;

use skiff_api::{Apps, Client, ClientConfig, Projects, RegistryCredentials, Services};

pub use cli::{Cli, Commands, Format, ResourcePath};
pub use error::CliError;
pub use output::OutputFormat;

use commands::{AppCommand, LogsCommand, ProjectCommand, RegistryCommand, ServiceCommand};

/// Builds an HTTP client from the parsed global options.
///
/// # Errors
///
/// Returns an error if the URL or timeout is invalid.
pub fn client_from_args(cli: &Cli) -> Result<Client, CliError> {
    let mut config = ClientConfig::new(&cli.api_url)?
        .with_request_timeout(Duration::from_secs(cli.timeout))?;
    if let Some(token) = &cli.token {
        config = config.with_access_token(token);
    }
    Ok(Client::new(config)?)
}

/// Runs one command against `api`, writing results to `writer`.
///
/// # Errors
///
/// Returns the first error raised by the command.
pub async fn run<A, W>(
    api: &A,
    writer: &mut W,
    format: &OutputFormat,
    command: &Commands,
) -> Result<(), CliError>
where
    A: Projects + Services + Apps + RegistryCredentials,
    W: Write,
{
    match command {
        Commands::Project { command } => {
            ProjectCommand::new(api).execute(writer, format, command).await
        }
        Commands::Service { command } => {
            ServiceCommand::new(api).execute(writer, format, command).await
        }
        Commands::App { command } => AppCommand::new(api).execute(writer, format, command).await,
        Commands::Logs(args) => LogsCommand::new(api).execute(writer, format, args).await,
        Commands::Registry { command } => {
            RegistryCommand::new(api).execute(writer, format, command).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use skiff_api::InMemoryPlatform;

    #[test]
    fn client_from_args_rejects_zero_timeout() {
        let cli = Cli::parse_from(["skiff", "--timeout", "0", "project", "list"]);
        let err = client_from_args(&cli).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn client_from_args_carries_token() {
        let cli = Cli::parse_from([
            "skiff",
            "--api-url",
            "http://localhost:3000/v1",
            "--token",
            "secret",
            "project",
            "list",
        ]);
        let client = client_from_args(&cli).unwrap();
        assert_eq!(client.config().access_token.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn run_dispatches_to_app_command() {
        let platform = InMemoryPlatform::lets_chat();
        let cli = Cli::parse_from(["skiff", "app", "restart", "letschat/frontend/node"]);
        let mut buf = Vec::new();
        run(&platform, &mut buf, &OutputFormat::new(cli.format), &cli.command)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Restarting app.\n");
    }
}
