//! Command-line argument parsing with clap.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use skiff_api::config::{DEFAULT_API_URL, ENV_ACCESS_TOKEN, ENV_API_URL, ENV_TIMEOUT_SECS};

/// Skiff CLI - deploy and operate containerized apps.
#[derive(Parser, Debug, Clone)]
#[command(name = "skiff")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// API base URL.
    #[arg(long, env = ENV_API_URL, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Access token.
    #[arg(long, env = ENV_ACCESS_TOKEN, hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = ENV_TIMEOUT_SECS, default_value_t = 30)]
    pub timeout: u64,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Project management.
    Project {
        /// Project subcommand to execute.
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Service management.
    Service {
        /// Service subcommand to execute.
        #[command(subcommand)]
        command: ServiceCommands,
    },

    /// App management.
    App {
        /// App subcommand to execute.
        #[command(subcommand)]
        command: AppCommands,
    },

    /// Print logs of a project, service or app.
    Logs(LogsArgs),

    /// Container registry credentials.
    Registry {
        /// Registry subcommand to execute.
        #[command(subcommand)]
        command: RegistryCommands,
    },
}

/// Project subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ProjectCommands {
    /// List all projects.
    List,

    /// Show a project with its services and apps.
    Show {
        /// Project name.
        project: String,
    },

    /// Delete a project.
    Delete {
        /// Project name.
        project: String,
        /// Delete even if a deployment is in progress.
        #[arg(long)]
        force: bool,
    },
}

/// Service subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ServiceCommands {
    /// Show a service with its apps.
    Show {
        /// `<project>/<service>`.
        path: ResourcePath,
    },

    /// Delete a service.
    Delete {
        /// `<project>/<service>`.
        path: ResourcePath,
        /// Delete even if a deployment is in progress.
        #[arg(long)]
        force: bool,
    },
}

/// App subcommands. Apps are addressed as `<project>/<service>/<app>`.
#[derive(Subcommand, Debug, Clone)]
pub enum AppCommands {
    /// Show an app.
    Show {
        /// `<project>/<service>/<app>`.
        path: ResourcePath,
    },

    /// Change the instance count.
    Scale {
        /// `<project>/<service>/<app>`.
        path: ResourcePath,
        /// Number of instances.
        instances: u32,
    },

    /// Restart every instance.
    Restart {
        /// `<project>/<service>/<app>`.
        path: ResourcePath,
    },

    /// Redeploy a previous version.
    Rollback {
        /// `<project>/<service>/<app>`.
        path: ResourcePath,
        /// Version to roll back to.
        version: String,
    },

    /// Delete an app.
    Delete {
        /// `<project>/<service>/<app>`.
        path: ResourcePath,
        /// Delete even if a deployment is in progress.
        #[arg(long)]
        force: bool,
    },

    /// Show resource usage.
    Metrics {
        /// `<project>/<service>/<app>`.
        path: ResourcePath,
    },
}

/// Arguments for `logs`.
#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    /// `<project>[/<service>[/<app>]]`.
    pub path: ResourcePath,

    /// Number of lines; 0 leaves it to the server.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub lines: usize,
}

/// Registry subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum RegistryCommands {
    /// Check whether credentials are stored.
    Check,

    /// Upload a credentials document (`-` reads stdin).
    Upload {
        /// Path to the document.
        file: PathBuf,
    },

    /// Remove stored credentials.
    Delete,
}

/// A slash-separated resource address with one to three segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    /// Project name.
    pub project: String,
    /// Service id.
    pub service: Option<String>,
    /// App id.
    pub app: Option<String>,
}

impl ResourcePath {
    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + usize::from(self.service.is_some()) + usize::from(self.app.is_some())
    }
}

impl FromStr for ResourcePath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() > 3 {
            return Err(format!("expected at most three segments, got '{s}'"));
        }
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(format!("empty segment in '{s}'"));
        }

        let mut parts = parts.into_iter().map(str::to_string);
        Ok(Self {
            project: parts.next().unwrap_or_default(),
            service: parts.next(),
            app: parts.next(),
        })
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.project)?;
        if let Some(service) = &self.service {
            write!(f, "/{service}")?;
        }
        if let Some(app) = &self.app {
            write!(f, "/{app}")?;
        }
        Ok(())
    }
}
