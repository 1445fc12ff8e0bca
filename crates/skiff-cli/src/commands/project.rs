//! Project command implementation.

use std::io::Write;

use skiff_api::Projects;

use crate::cli::ProjectCommands;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Project command executor.
pub struct ProjectCommand<'a, A> {
    api: &'a A,
}

impl<'a, A: Projects> ProjectCommand<'a, A> {
    /// Create a new project command.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Execute a project subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call or writing the output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        command: &ProjectCommands,
    ) -> Result<(), CliError> {
        match command {
            ProjectCommands::List => {
                let projects = Projects::list(self.api).await?.into_body();
                format.write(writer, projects.as_slice())?;
            }
            ProjectCommands::Show { project } => {
                let project = Projects::get(self.api, project).await?.into_body();
                format.write(writer, &project)?;
            }
            ProjectCommands::Delete { project, force } => {
                let status = Projects::delete(self.api, project, *force).await?.into_body();
                format.write(writer, &status)?;
            }
        }
        Ok(())
    }
}
