//! Resource entities exchanged with the platform.
//!
//! This module provides:
//! - [`Project`]: top-level resource owning [`Service`]s
//! - [`Service`]: a group of [`App`]s within a project
//! - [`App`]: a deployed container with its [`PortMap`]s, [`Volume`]s and [`Domain`]
//! - [`StatusResponse`]: the generic success/failure envelope
//! - [`LogEntry`]: one line of application output
//!
//! Children never reference their parents; the parent identity is always an
//! explicit argument of the endpoint call.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three addressable resource levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A project.
    Project,
    /// A service inside a project.
    Service,
    /// An app inside a service.
    App,
}

impl ResourceKind {
    /// Returns the capitalized resource name used in messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Service => "Service",
            Self::App => "App",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic `{status, message}` envelope returned by operations without a
/// resource body (delete, restart, registry credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// `"success"` or `"error"`.
    pub status: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl StatusResponse {
    /// Creates a success envelope.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    /// Creates an error envelope.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    /// Returns true if the status is `"success"`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// A project: the unit of deployment, identified by its name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project name.
    #[serde(rename = "project")]
    pub name: String,
    /// Services owned by this project, in declaration order.
    #[serde(default)]
    pub services: Vec<Service>,
}

impl Project {
    /// Creates an empty project.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: Vec::new(),
        }
    }

    /// Adds a service and returns self for chaining.
    #[must_use]
    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    /// Looks up a service by id.
    #[must_use]
    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    /// Looks up a service by id for mutation.
    pub fn service_mut(&mut self, id: &str) -> Option<&mut Service> {
        self.services.iter_mut().find(|s| s.id == id)
    }
}

/// A service: a named group of apps within one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Identifier, unique within the project.
    pub id: String,
    /// Apps owned by this service, in declaration order.
    #[serde(default)]
    pub apps: Vec<App>,
}

impl Service {
    /// Creates an empty service.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            apps: Vec::new(),
        }
    }

    /// Adds an app and returns self for chaining.
    #[must_use]
    pub fn with_app(mut self, app: App) -> Self {
        self.apps.push(app);
        self
    }

    /// Looks up an app by id.
    #[must_use]
    pub fn app(&self, id: &str) -> Option<&App> {
        self.apps.iter().find(|a| a.id == id)
    }

    /// Looks up an app by id for mutation.
    pub fn app_mut(&mut self, id: &str) -> Option<&mut App> {
        self.apps.iter_mut().find(|a| a.id == id)
    }
}

/// A single exposed container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMap {
    /// Port number inside the container.
    pub port: u16,
}

/// A persistent volume mounted into an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Absolute mount path, unique within the app.
    pub path: String,
    /// Unit-suffixed size, e.g. `8GB`.
    pub size: String,
}

/// An externally routable address bound to one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// The public URI.
    pub uri: String,
}

/// Deployment descriptor of a single containerized app.
///
/// Optional fields are left to server-side defaults when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// Identifier, unique within the service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Container image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Command overriding the image entrypoint.
    #[serde(rename = "cmd", default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Memory allocation per instance in MiB.
    #[serde(rename = "mem", default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    /// Number of running instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    /// Exposed ports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_mappings: Vec<PortMap>,
    /// Persistent volumes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    /// Public domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Ids of apps this app depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Currently deployed version (deployment timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Previously deployed versions, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
}

impl App {
    /// Creates an app with an id and image.
    #[must_use]
    pub fn new(id: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            image: Some(image.into()),
            ..Self::default()
        }
    }

    /// Sets the memory allocation in MiB.
    #[must_use]
    pub const fn with_memory(mut self, memory: u32) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Sets the instance count.
    #[must_use]
    pub const fn with_instances(mut self, instances: u32) -> Self {
        self.instances = Some(instances);
        self
    }

    /// Adds an exposed port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port_mappings.push(PortMap { port });
        self
    }

    /// Adds a volume.
    #[must_use]
    pub fn with_volume(mut self, path: impl Into<String>, size: impl Into<String>) -> Self {
        self.volumes.push(Volume {
            path: path.into(),
            size: size.into(),
        });
        self
    }

    /// Sets an environment variable, replacing any previous value.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the public domain.
    #[must_use]
    pub fn with_domain(mut self, uri: impl Into<String>) -> Self {
        self.domain = Some(Domain { uri: uri.into() });
        self
    }

    /// Sets the deployed version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// One unit of log output from an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Project the line came from.
    pub project: String,
    /// Service the line came from.
    pub service: String,
    /// App the line came from.
    pub app: String,
    /// When the line was produced.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// The raw log line.
    pub log: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_uses_wire_name_key() {
        let project = Project::new("letschat");
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(value, json!({"project": "letschat", "services": []}));
    }

    #[test]
    fn app_omits_unset_fields() {
        let app = App::new("node", "mikemichel/lets-chat").with_memory(1024);
        let value = serde_json::to_value(&app).unwrap();
        assert_eq!(
            value,
            json!({"id": "node", "image": "mikemichel/lets-chat", "mem": 1024})
        );
    }

    #[test]
    fn app_decodes_full_payload() {
        let app: App = serde_json::from_value(json!({
            "id": "node",
            "image": "mikemichel/lets-chat",
            "cmd": "npm start",
            "mem": 1024,
            "instances": 1,
            "port_mappings": [{"port": 5000}],
            "volumes": [{"path": "/var/www", "size": "8GB"}],
            "domain": {"uri": "letschat.skiff.zone"},
            "env": {"LCB_DATABASE_URI": "mongodb://..."},
            "dependencies": ["../backend/mongodb"],
            "version": "2015-12-21T10:56:33.081Z",
            "versions": ["2015-12-20T09:00:00.000Z"]
        }))
        .unwrap();

        assert_eq!(app.command.as_deref(), Some("npm start"));
        assert_eq!(app.port_mappings, vec![PortMap { port: 5000 }]);
        assert_eq!(app.volumes[0].size, "8GB");
        assert_eq!(app.domain.as_ref().map(|d| d.uri.as_str()), Some("letschat.skiff.zone"));
        assert_eq!(app.versions.len(), 1);
    }

    #[test]
    fn app_rejects_negative_memory() {
        let result = serde_json::from_value::<App>(json!({"id": "node", "mem": -1}));
        assert!(result.is_err());
    }

    #[test]
    fn lookups_by_id() {
        let project = Project::new("letschat")
            .with_service(Service::new("frontend").with_app(App::new("node", "img")))
            .with_service(Service::new("backend"));

        assert!(project.service("backend").is_some());
        assert!(project.service("missing").is_none());
        assert!(project.service("frontend").and_then(|s| s.app("node")).is_some());
    }

    #[test]
    fn status_response_success() {
        let ok = StatusResponse::success("Project letschat successfully deleted.");
        assert!(ok.is_success());
        assert!(!StatusResponse::error("nope").is_success());
    }

    #[test]
    fn log_entry_uses_camel_case_timestamp() {
        let entry: LogEntry = serde_json::from_value(json!({
            "project": "letschat",
            "service": "frontend",
            "app": "node",
            "createdAt": "2015-11-04T14:17:19Z",
            "log": "1234"
        }))
        .unwrap();
        assert_eq!(entry.log, "1234");
        assert_eq!(entry.created_at.to_rfc3339(), "2015-11-04T14:17:19+00:00");
    }
}
