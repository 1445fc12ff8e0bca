//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use serde::Serialize;
use skiff_api::{App, LogEntry, Metrics, Project, Service, StatusResponse};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay + ?Sized,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => value.write_table(writer)?,
        }
        Ok(())
    }

    /// Write one log entry: a compact JSON line, or a plain text line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_log<W: Write>(&self, writer: &mut W, entry: &LogEntry) -> Result<(), CliError> {
        if self.is_json() {
            serde_json::to_writer(&mut *writer, entry)
                .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
            writeln!(writer)?;
        } else {
            writeln!(
                writer,
                "{} {}/{}/{} {}",
                entry.created_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                entry.project,
                entry.service,
                entry.app,
                entry.log
            )?;
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

impl TableDisplay for [Project] {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No projects found.")?;
            return Ok(());
        }

        writeln!(writer, "{:<24} {:>8} {:>6}", "PROJECT", "SERVICES", "APPS")?;
        for project in self {
            let apps: usize = project.services.iter().map(|s| s.apps.len()).sum();
            writeln!(
                writer,
                "{:<24} {:>8} {:>6}",
                project.name,
                project.services.len(),
                apps
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for Project {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Project: {}", self.name)?;
        for service in &self.services {
            writeln!(writer)?;
            service.write_table(writer)?;
        }
        Ok(())
    }
}

impl TableDisplay for Service {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Service: {}", self.id)?;
        writeln!(
            writer,
            "  {:<16} {:<32} {:>9} {:>8} {:<24}",
            "APP", "IMAGE", "INSTANCES", "MEMORY", "VERSION"
        )?;
        for app in &self.apps {
            writeln!(
                writer,
                "  {:<16} {:<32} {:>9} {:>8} {:<24}",
                app.id,
                app.image.as_deref().unwrap_or("-"),
                display_or_dash(app.instances),
                app.memory.map_or_else(|| "-".to_string(), |m| format!("{m}MB")),
                app.version.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for App {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "App: {}", self.id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Image:      {}", self.image.as_deref().unwrap_or("-"))?;
        if let Some(command) = &self.command {
            writeln!(writer, "Command:    {command}")?;
        }
        writeln!(writer, "Instances:  {}", display_or_dash(self.instances))?;
        writeln!(
            writer,
            "Memory:     {}",
            self.memory.map_or_else(|| "-".to_string(), |m| format!("{m} MB"))
        )?;
        if let Some(domain) = &self.domain {
            writeln!(writer, "Domain:     {}", domain.uri)?;
        }
        if let Some(version) = &self.version {
            writeln!(writer, "Version:    {version}")?;
        }

        if !self.port_mappings.is_empty() {
            let ports: Vec<String> = self.port_mappings.iter().map(|p| p.port.to_string()).collect();
            writeln!(writer, "Ports:      {}", ports.join(", "))?;
        }
        if !self.volumes.is_empty() {
            writeln!(writer, "Volumes:")?;
            for volume in &self.volumes {
                writeln!(writer, "  {} ({})", volume.path, volume.size)?;
            }
        }
        if !self.env.is_empty() {
            writeln!(writer, "Environment:")?;
            for (key, value) in &self.env {
                writeln!(writer, "  {key}={value}")?;
            }
        }
        if !self.dependencies.is_empty() {
            writeln!(writer, "Depends on: {}", self.dependencies.join(", "))?;
        }
        if !self.versions.is_empty() {
            writeln!(writer, "Previous versions:")?;
            for version in &self.versions {
                writeln!(writer, "  {version}")?;
            }
        }
        Ok(())
    }
}

impl TableDisplay for StatusResponse {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.message)?;
        Ok(())
    }
}

impl TableDisplay for Metrics {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No metrics reported.")?;
            return Ok(());
        }

        writeln!(writer, "{:<44} {:<56} {:>16}", "METRIC", "RESOURCE", "LATEST")?;
        for (name, series) in self.iter() {
            for (key, points) in series.iter() {
                let latest = points
                    .last()
                    .map_or_else(|| "-".to_string(), |p| format!("{:.2}", p.value));
                writeln!(writer, "{name:<44} {key:<56} {latest:>16}")?;
            }
        }
        Ok(())
    }
}

fn display_or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
