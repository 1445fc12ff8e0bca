//! Service command implementation.

use std::io::Write;

use skiff_api::Services;

use super::service_address;
use crate::cli::ServiceCommands;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Service command executor.
pub struct ServiceCommand<'a, A> {
    api: &'a A,
}

impl<'a, A: Services> ServiceCommand<'a, A> {
    /// Create a new service command.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Execute a service subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is malformed, the API call fails or
    /// writing the output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &ServiceCommands,
    ) -> Result<(), CliError> {
        match command {
            ServiceCommands::Show { path } => {
                let (project, service) = service_address(path)?;
                let service = Services::get(self.api, project, service).await?.into_body();
                format.write(writer, &service)?;
            }
            ServiceCommands::Delete { path, force } => {
                let (project, service) = service_address(path)?;
                let status = Services::delete(self.api, project, service, *force)
                    .await?
                    .into_body();
                format.write(writer, &status)?;
            }
        }
        Ok(())
    }
}
