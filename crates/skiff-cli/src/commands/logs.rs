//! Logs command implementation.
//!
//! Entries are written as they arrive; a failure reported on the error
//! channel ends the command after everything received so far is printed.

use std::io::Write;

use futures::StreamExt;
use skiff_api::{Apps, LogStream, Projects, Services};
use tracing::debug;

use crate::cli::LogsArgs;
use crate::error::CliError;
use crate::output::OutputFormat;

/// Logs command executor.
pub struct LogsCommand<'a, A> {
    api: &'a A,
}

impl<'a, A> LogsCommand<'a, A>
where
    A: Projects + Services + Apps,
{
    /// Create a new logs command.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Stream logs for a project, service or app.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the stream, or an error if writing the
    /// output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &LogsArgs,
    ) -> Result<(), CliError> {
        let path = &args.path;
        let stream: LogStream = match (&path.service, &path.app) {
            (None, _) => Projects::get_logs(self.api, &path.project, args.lines),
            (Some(service), None) => {
                Services::get_logs(self.api, &path.project, service, args.lines)
            }
            (Some(service), Some(app)) => {
                Apps::get_logs(self.api, &path.project, service, app, args.lines)
            }
        };

        let mut entries = Box::pin(stream.into_stream());
        let mut printed = 0usize;
        while let Some(entry) = entries.next().await {
            format.write_log(writer, &entry?)?;
            writer.flush()?;
            printed += 1;
        }
        debug!(scope = %path, printed, "log stream finished");
        Ok(())
    }
}
