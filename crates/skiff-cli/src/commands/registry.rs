//! Registry credentials command implementation.

use std::io::Write;
use std::path::Path;

use skiff_api::{RegistryCredentials, Response, StatusResponse};

use crate::cli::RegistryCommands;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Registry command executor.
pub struct RegistryCommand<'a, A> {
    api: &'a A,
}

impl<'a, A: RegistryCredentials> RegistryCommand<'a, A> {
    /// Create a new registry command.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Execute a registry subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be opened, the API call fails
    /// or writing the output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &RegistryCommands,
    ) -> Result<(), CliError> {
        let response = match command {
            RegistryCommands::Check => RegistryCredentials::check(self.api).await?,
            RegistryCommands::Upload { file } => self.upload(file).await?,
            RegistryCommands::Delete => RegistryCredentials::delete(self.api).await?,
        };
        format.write(writer, &response.into_body())?;
        Ok(())
    }

    async fn upload(&self, file: &Path) -> Result<Response<StatusResponse>, CliError> {
        let response = if file == Path::new("-") {
            RegistryCredentials::upload(self.api, tokio::io::stdin()).await?
        } else {
            let reader = tokio::fs::File::open(file).await?;
            RegistryCredentials::upload(self.api, reader).await?
        };
        Ok(response)
    }
}
