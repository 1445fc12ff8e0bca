//! In-memory implementation of every endpoint contract.
//!
//! [`InMemoryPlatform`] keeps projects, registry credentials and log lines
//! behind a lock and answers the way the hosted platform does, including its
//! messages. Reads hand out clones, so mutating a returned entity never
//! changes stored state. It backs the scenario tests and the CLI tests.

use std::future::{Future, ready};
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::clock::{SharedClock, SystemClock};
use crate::endpoints::{Apps, Projects, RegistryCredentials, Services};
use crate::error::{ApiError, ErrorResponse, Result};
use crate::logs::{LogScope, LogStream};
use crate::metrics::{DataPoint, Metrics};
use crate::transport::Response;
use crate::types::{App, LogEntry, Project, ResourceKind, Service, StatusResponse};
use crate::validation::{Mode, validate_app, validate_path, validate_project, validate_version};

/// Account name used in metric resource keys.
const ACCOUNT: &str = "skiff";

/// Largest instance count the platform accepts for one app.
pub const MAX_INSTANCES: u32 = 1000;

/// What the credential store reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryState {
    /// Credentials are stored.
    Present,
    /// No credentials are stored.
    #[default]
    Absent,
    /// The caller has no access token.
    MissingToken,
}

#[derive(Debug, Default)]
struct State {
    projects: Vec<Project>,
    registry: RegistryState,
    logs: Vec<LogEntry>,
}

/// Endpoint contracts over local state.
#[derive(Debug, Clone)]
pub struct InMemoryPlatform {
    state: Arc<RwLock<State>>,
    clock: SharedClock,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    /// Creates an empty platform.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            clock: Arc::new(SystemClock),
        }
    }

    /// A platform seeded with [`lets_chat_project`], stored registry
    /// credentials and one log line for `letschat/frontend/node`.
    #[must_use]
    pub fn lets_chat() -> Self {
        let platform = Self::new()
            .with_projects(vec![lets_chat_project()])
            .with_registry(RegistryState::Present);
        platform.push_log("letschat", "frontend", "node", "1234");
        platform
    }

    /// Replaces the stored projects.
    #[must_use]
    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        self.state.write().projects = projects;
        self
    }

    /// Sets the registry credential state.
    #[must_use]
    pub fn with_registry(self, registry: RegistryState) -> Self {
        self.state.write().registry = registry;
        self
    }

    /// Replaces the clock used for log and metric timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Snapshot of all projects.
    #[must_use]
    pub fn projects(&self) -> Vec<Project> {
        self.state.read().projects.clone()
    }

    /// Current registry credential state.
    #[must_use]
    pub fn registry_state(&self) -> RegistryState {
        self.state.read().registry
    }

    /// Appends a log line for an app, timestamped now.
    pub fn push_log(&self, project: &str, service: &str, app: &str, line: &str) {
        let entry = LogEntry {
            project: project.to_string(),
            service: service.to_string(),
            app: app.to_string(),
            created_at: self.clock.now(),
            log: line.to_string(),
        };
        self.state.write().logs.push(entry);
    }

    fn logs(&self, scope: &LogScope, limit: usize) -> LogStream {
        if let Err(error) = validate_path(&scope.path()) {
            return LogStream::failed(error.into());
        }

        let state = self.state.read();
        let resolved = match (&scope.service, &scope.app) {
            (Some(service), Some(app)) => find_app(&state.projects, &scope.project, service, app).map(|_| ()),
            (Some(service), None) => find_service(&state.projects, &scope.project, service).map(|_| ()),
            _ => find_project(&state.projects, &scope.project).map(|_| ()),
        };
        if let Err(error) = resolved {
            debug!(project = %scope.project, "log scope not found");
            return LogStream::failed(error);
        }

        let mut entries: Vec<LogEntry> = state
            .logs
            .iter()
            .filter(|e| e.project == scope.project)
            .filter(|e| scope.service.as_ref().is_none_or(|s| &e.service == s))
            .filter(|e| scope.app.as_ref().is_none_or(|a| &e.app == a))
            .cloned()
            .collect();
        if limit > 0 && entries.len() > limit {
            let excess = entries.len() - limit;
            entries.drain(..excess);
        }
        LogStream::from_entries(entries)
    }

    fn record(&self, state: &mut State, project: &str, service: &str, app: &str, line: String) {
        state.logs.push(LogEntry {
            project: project.to_string(),
            service: service.to_string(),
            app: app.to_string(),
            created_at: self.clock.now(),
            log: line,
        });
    }

    fn mutate_app<F>(&self, project: &str, service: &str, app: &str, change: F) -> Result<Response<App>>
    where
        F: FnOnce(&mut App) -> Result<String>,
    {
        validate_app_path(project, service, app)?;

        let mut state = self.state.write();
        let target = find_app_mut(&mut state.projects, project, service, app)?;
        let line = change(target)?;
        let updated = target.clone();
        self.record(&mut state, project, service, app, line);
        Ok(Response::detached(updated))
    }

    fn metrics(&self, project: &str, service: &str, app: &App) -> Metrics {
        let now = self.clock.now();
        let prefix = format!("{ACCOUNT}-{project}_{service}_{}", app.id);
        let mut metrics = Metrics::new();

        let per_instance = f64::from(app.memory.unwrap_or(0)) * 1024.0 * 1024.0 / 8.0;
        for instance in 0..app.instances.unwrap_or(1).min(MAX_INSTANCES) {
            metrics.record(
                "container_memory_usage_bytes",
                format!("{prefix}.{instance}"),
                DataPoint::new(now, per_instance),
            );
        }
        for volume in &app.volumes {
            metrics.record(
                "container_volume_usage_percentage",
                format!("{prefix}.{}", volume.path),
                DataPoint::new(now, 0.0),
            );
        }
        metrics
    }

    fn registry_guard(&self) -> Result<RegistryState> {
        match self.state.read().registry {
            RegistryState::MissingToken => Err(ApiError::MissingAccessToken),
            other => Ok(other),
        }
    }
}

fn validate_app_path(project: &str, service: &str, app: &str) -> Result<()> {
    validate_path(&[
        (ResourceKind::Project, project),
        (ResourceKind::Service, service),
        (ResourceKind::App, app),
    ])?;
    Ok(())
}

fn find_project<'a>(projects: &'a [Project], project: &str) -> Result<&'a Project> {
    projects
        .iter()
        .find(|p| p.name == project)
        .ok_or_else(|| ApiError::not_found(ResourceKind::Project, project))
}

fn find_project_mut<'a>(projects: &'a mut [Project], project: &str) -> Result<&'a mut Project> {
    projects
        .iter_mut()
        .find(|p| p.name == project)
        .ok_or_else(|| ApiError::not_found(ResourceKind::Project, project))
}

fn find_service<'a>(projects: &'a [Project], project: &str, service: &str) -> Result<&'a Service> {
    projects
        .iter()
        .find(|p| p.name == project)
        .and_then(|p| p.service(service))
        .ok_or_else(|| ApiError::not_found(ResourceKind::Service, service))
}

fn find_app<'a>(projects: &'a [Project], project: &str, service: &str, app: &str) -> Result<&'a App> {
    projects
        .iter()
        .find(|p| p.name == project)
        .and_then(|p| p.service(service))
        .and_then(|s| s.app(app))
        .ok_or_else(|| ApiError::not_found(ResourceKind::App, app))
}

fn find_app_mut<'a>(
    projects: &'a mut [Project],
    project: &str,
    service: &str,
    app: &str,
) -> Result<&'a mut App> {
    projects
        .iter_mut()
        .find(|p| p.name == project)
        .and_then(|p| p.service_mut(service))
        .and_then(|s| s.app_mut(app))
        .ok_or_else(|| ApiError::not_found(ResourceKind::App, app))
}

/// Rejects instance counts above [`MAX_INSTANCES`] with a `400`.
fn check_instances(instances: Option<u32>) -> Result<()> {
    match instances {
        Some(n) if n > MAX_INSTANCES => Err(ErrorResponse::new(
            StatusCode::BAD_REQUEST,
            format!("Instance count {n} exceeds the maximum of {MAX_INSTANCES}"),
            None,
        )
        .into()),
        _ => Ok(()),
    }
}

/// Applies the fields present in `patch`. Empty collections count as
/// absent, so an update never clears ports, volumes, env or dependencies.
fn apply_patch(app: &mut App, patch: &App) {
    if patch.image.is_some() {
        app.image.clone_from(&patch.image);
    }
    if patch.command.is_some() {
        app.command.clone_from(&patch.command);
    }
    if patch.memory.is_some() {
        app.memory = patch.memory;
    }
    if patch.instances.is_some() {
        app.instances = patch.instances;
    }
    if !patch.port_mappings.is_empty() {
        app.port_mappings.clone_from(&patch.port_mappings);
    }
    if !patch.volumes.is_empty() {
        app.volumes.clone_from(&patch.volumes);
    }
    if patch.domain.is_some() {
        app.domain.clone_from(&patch.domain);
    }
    if !patch.env.is_empty() {
        app.env.clone_from(&patch.env);
    }
    if !patch.dependencies.is_empty() {
        app.dependencies.clone_from(&patch.dependencies);
    }
}

fn success(message: String) -> Response<StatusResponse> {
    Response::detached(StatusResponse::success(message))
}

impl InMemoryPlatform {
    fn create_project(&self, project: &Project) -> Result<Response<Project>> {
        validate_project(project)?;
        for app in project.services.iter().flat_map(|s| &s.apps) {
            check_instances(app.instances)?;
        }
        let mut state = self.state.write();
        if state.projects.iter().any(|p| p.name == project.name) {
            return Err(ErrorResponse::new(
                StatusCode::CONFLICT,
                format!("Project with id \"{}\" already exists", project.name),
                None,
            )
            .into());
        }

        state.projects.push(project.clone());
        for service in &project.services {
            for app in &service.apps {
                let line = format!("Deploying {}", app.image.as_deref().unwrap_or_default());
                self.record(&mut state, &project.name, &service.id, &app.id, line);
            }
        }
        debug!(project = %project.name, "project created");
        Ok(Response::detached(project.clone()))
    }

    fn get_project(&self, project: &str) -> Result<Response<Project>> {
        validate_path(&[(ResourceKind::Project, project)])?;
        let state = self.state.read();
        Ok(Response::detached(find_project(&state.projects, project)?.clone()))
    }

    fn update_project(&self, project: &str, update: &Project) -> Result<Response<Project>> {
        validate_path(&[(ResourceKind::Project, project)])?;
        validate_project(update)?;
        let mut state = self.state.write();
        let stored = find_project_mut(&mut state.projects, project)?;
        stored.services.clone_from(&update.services);
        Ok(Response::detached(stored.clone()))
    }

    fn delete_project(&self, project: &str) -> Result<Response<StatusResponse>> {
        validate_path(&[(ResourceKind::Project, project)])?;
        let mut state = self.state.write();
        find_project(&state.projects, project)?;
        state.projects.retain(|p| p.name != project);
        state.logs.retain(|e| e.project != project);
        Ok(success(format!("Project {project} successfully deleted.")))
    }

    fn list_services(&self, project: &str) -> Result<Response<Vec<Service>>> {
        validate_path(&[(ResourceKind::Project, project)])?;
        let state = self.state.read();
        Ok(Response::detached(find_project(&state.projects, project)?.services.clone()))
    }

    fn get_service(&self, project: &str, service: &str) -> Result<Response<Service>> {
        validate_path(&[(ResourceKind::Project, project), (ResourceKind::Service, service)])?;
        let state = self.state.read();
        Ok(Response::detached(find_service(&state.projects, project, service)?.clone()))
    }

    fn delete_service(&self, project: &str, service: &str) -> Result<Response<StatusResponse>> {
        validate_path(&[(ResourceKind::Project, project), (ResourceKind::Service, service)])?;
        let mut state = self.state.write();
        find_service(&state.projects, project, service)?;
        if let Some(stored) = state.projects.iter_mut().find(|p| p.name == project) {
            stored.services.retain(|s| s.id != service);
        }
        state
            .logs
            .retain(|e| !(e.project == project && e.service == service));
        Ok(success(format!("Service {service} successfully deleted.")))
    }

    fn list_apps(&self, project: &str, service: &str) -> Result<Response<Vec<App>>> {
        validate_path(&[(ResourceKind::Project, project), (ResourceKind::Service, service)])?;
        let state = self.state.read();
        Ok(Response::detached(find_service(&state.projects, project, service)?.apps.clone()))
    }

    fn get_app(&self, project: &str, service: &str, app: &str) -> Result<Response<App>> {
        validate_app_path(project, service, app)?;
        let state = self.state.read();
        Ok(Response::detached(find_app(&state.projects, project, service, app)?.clone()))
    }

    fn delete_app(&self, project: &str, service: &str, app: &str) -> Result<Response<StatusResponse>> {
        validate_app_path(project, service, app)?;
        let mut state = self.state.write();
        find_app(&state.projects, project, service, app)?;
        if let Some(stored) = state
            .projects
            .iter_mut()
            .find(|p| p.name == project)
            .and_then(|p| p.service_mut(service))
        {
            stored.apps.retain(|a| a.id != app);
        }
        state
            .logs
            .retain(|e| !(e.project == project && e.service == service && e.app == app));
        Ok(success(format!("App {app} successfully deleted.")))
    }

    fn rollback_app(&self, project: &str, service: &str, app: &str, version: &str) -> Result<Response<App>> {
        validate_version(version)?;
        self.mutate_app(project, service, app, |stored| {
            let known = stored.version.as_deref() == Some(version)
                || stored.versions.iter().any(|v| v == version);
            if !known {
                return Err(ErrorResponse::new(
                    StatusCode::NOT_FOUND,
                    format!("Version \"{version}\" of app \"{app}\" could not be found"),
                    None,
                )
                .into());
            }

            if let Some(current) = stored.version.take() {
                if !stored.versions.contains(&current) {
                    stored.versions.push(current);
                }
            }
            stored.version = Some(version.to_string());
            Ok(format!("Rolling back to {version}"))
        })
    }

    fn app_metrics(&self, project: &str, service: &str, app: &str) -> Result<Response<Metrics>> {
        validate_app_path(project, service, app)?;
        let state = self.state.read();
        let found = find_app(&state.projects, project, service, app)?;
        Ok(Response::detached(self.metrics(project, service, found)))
    }

    fn delete_credentials(&self) -> Result<Response<StatusResponse>> {
        if self.registry_guard()? == RegistryState::Absent {
            return Err(absent_credentials());
        }
        self.state.write().registry = RegistryState::Absent;
        Ok(success("Docker credentials removed".to_string()))
    }

    fn check_credentials(&self) -> Result<Response<StatusResponse>> {
        match self.registry_guard()? {
            RegistryState::Present => Ok(success("Docker credentials exist".to_string())),
            _ => Err(absent_credentials()),
        }
    }
}

impl Projects for InMemoryPlatform {
    fn create(&self, project: &Project) -> impl Future<Output = Result<Response<Project>>> + Send {
        ready(self.create_project(project))
    }

    fn list(&self) -> impl Future<Output = Result<Response<Vec<Project>>>> + Send {
        ready(Ok(Response::detached(self.projects())))
    }

    fn get(&self, project: &str) -> impl Future<Output = Result<Response<Project>>> + Send {
        ready(self.get_project(project))
    }

    fn update(
        &self,
        project: &str,
        update: &Project,
        _force: bool,
    ) -> impl Future<Output = Result<Response<Project>>> + Send {
        ready(self.update_project(project, update))
    }

    fn delete(
        &self,
        project: &str,
        _force: bool,
    ) -> impl Future<Output = Result<Response<StatusResponse>>> + Send {
        ready(self.delete_project(project))
    }

    fn get_logs(&self, project: &str, limit: usize) -> LogStream {
        self.logs(&LogScope::project(project), limit)
    }
}

impl Services for InMemoryPlatform {
    fn list(&self, project: &str) -> impl Future<Output = Result<Response<Vec<Service>>>> + Send {
        ready(self.list_services(project))
    }

    fn get(
        &self,
        project: &str,
        service: &str,
    ) -> impl Future<Output = Result<Response<Service>>> + Send {
        ready(self.get_service(project, service))
    }

    fn delete(
        &self,
        project: &str,
        service: &str,
        _force: bool,
    ) -> impl Future<Output = Result<Response<StatusResponse>>> + Send {
        ready(self.delete_service(project, service))
    }

    fn get_logs(&self, project: &str, service: &str, limit: usize) -> LogStream {
        self.logs(&LogScope::service(project, service), limit)
    }
}

impl Apps for InMemoryPlatform {
    fn list(
        &self,
        project: &str,
        service: &str,
    ) -> impl Future<Output = Result<Response<Vec<App>>>> + Send {
        ready(self.list_apps(project, service))
    }

    fn get(
        &self,
        project: &str,
        service: &str,
        app: &str,
    ) -> impl Future<Output = Result<Response<App>>> + Send {
        ready(self.get_app(project, service, app))
    }

    fn update(
        &self,
        project: &str,
        service: &str,
        app: &str,
        update: &App,
        _force: bool,
    ) -> impl Future<Output = Result<Response<App>>> + Send {
        ready(validate_app(update, Mode::Update).map_err(ApiError::from).and_then(|()| {
            check_instances(update.instances)?;
            self.mutate_app(project, service, app, |stored| {
                apply_patch(stored, update);
                Ok(format!("Updating app {app}"))
            })
        }))
    }

    fn delete(
        &self,
        project: &str,
        service: &str,
        app: &str,
        _force: bool,
    ) -> impl Future<Output = Result<Response<StatusResponse>>> + Send {
        ready(self.delete_app(project, service, app))
    }

    fn scale(
        &self,
        project: &str,
        service: &str,
        app: &str,
        instances: u32,
    ) -> impl Future<Output = Result<Response<App>>> + Send {
        ready(check_instances(Some(instances)).and_then(|()| {
            self.mutate_app(project, service, app, |stored| {
                stored.instances = Some(instances);
                Ok(format!("Scaling to {instances} instances"))
            })
        }))
    }

    fn rollback(
        &self,
        project: &str,
        service: &str,
        app: &str,
        version: &str,
    ) -> impl Future<Output = Result<Response<App>>> + Send {
        ready(self.rollback_app(project, service, app, version))
    }

    fn restart(
        &self,
        project: &str,
        service: &str,
        app: &str,
    ) -> impl Future<Output = Result<Response<StatusResponse>>> + Send {
        ready(
            self.mutate_app(project, service, app, |_| Ok("Restarting app.".to_string()))
                .map(|_| success("Restarting app.".to_string())),
        )
    }

    fn get_metrics(
        &self,
        project: &str,
        service: &str,
        app: &str,
    ) -> impl Future<Output = Result<Response<Metrics>>> + Send {
        ready(self.app_metrics(project, service, app))
    }

    fn get_logs(&self, project: &str, service: &str, app: &str, limit: usize) -> LogStream {
        self.logs(&LogScope::app(project, service, app), limit)
    }
}

impl RegistryCredentials for InMemoryPlatform {
    async fn upload<R>(&self, mut reader: R) -> Result<Response<StatusResponse>>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.registry_guard()?;

        let mut document = Vec::new();
        reader.read_to_end(&mut document).await?;

        let accepted = serde_json::from_slice::<serde_json::Value>(&document)
            .ok()
            .and_then(|value| value.get("auth").and_then(|a| a.as_str()).map(str::to_owned))
            .is_some_and(|auth| !auth.is_empty());
        if !accepted {
            return Err(ErrorResponse::new(
                StatusCode::BAD_REQUEST,
                "Unable to upload docker credentials",
                None,
            )
            .into());
        }

        self.state.write().registry = RegistryState::Present;
        Ok(success("Uploaded docker credentials".to_string()))
    }

    fn delete(&self) -> impl Future<Output = Result<Response<StatusResponse>>> + Send {
        ready(self.delete_credentials())
    }

    fn check(&self) -> impl Future<Output = Result<Response<StatusResponse>>> + Send {
        ready(self.check_credentials())
    }
}

fn absent_credentials() -> ApiError {
    ErrorResponse::new(StatusCode::NOT_FOUND, "Docker credentials could not be found", None).into()
}

/// The `letschat` project: a `frontend` service running the `node` app and a
/// `backend` service running `mongodb`.
#[must_use]
pub fn lets_chat_project() -> Project {
    let mut node = App::new("node", "mikemichel/lets-chat")
        .with_memory(1024)
        .with_instances(1)
        .with_port(5000)
        .with_volume("/var/www", "8GB")
        .with_volume("/var/test", "8GB")
        .with_env("LCB_DATABASE_URI", "mongodb://mongodb.backend.letschat:27017/letschat")
        .with_domain("letschat.skiff.zone")
        .with_version("2015-12-21T10:56:33.081Z");
    node.versions = vec!["2015-12-20T08:01:12.532Z".to_string()];
    node.dependencies = vec!["../backend/mongodb".to_string()];

    let mongodb = App::new("mongodb", "mongo")
        .with_memory(512)
        .with_instances(1)
        .with_port(27017);

    Project::new("letschat")
        .with_service(Service::new("frontend").with_app(node))
        .with_service(Service::new("backend").with_app(mongodb))
}
