//! Endpoint contracts, one trait per resource kind.
//!
//! [`Client`](crate::Client) implements them over HTTP and
//! [`InMemoryPlatform`](crate::memory::InMemoryPlatform) over local state.
//! Several traits share method names (`get`, `list`, `delete`, `get_logs`),
//! so code that has more than one in scope calls them as
//! `Projects::get(&client, "letschat")`.
//!
//! Every operation checks its identifying path first: an empty segment is a
//! [`Validation`](crate::ErrorKind::Validation) failure raised without a
//! network call. Operations that return a [`LogStream`] never fail directly;
//! failures arrive on its error channel.

mod apps;
mod projects;
mod registry;
mod services;

use std::future::Future;

use tokio::io::AsyncRead;

use crate::error::Result;
use crate::logs::LogStream;
use crate::metrics::Metrics;
use crate::transport::Response;
use crate::types::{App, Project, Service, StatusResponse};

/// Operations on projects.
pub trait Projects: Send + Sync {
    /// Creates a project with its services and apps.
    fn create(&self, project: &Project) -> impl Future<Output = Result<Response<Project>>> + Send;

    /// Lists all projects.
    fn list(&self) -> impl Future<Output = Result<Response<Vec<Project>>>> + Send;

    /// Fetches one project.
    fn get(&self, project: &str) -> impl Future<Output = Result<Response<Project>>> + Send;

    /// Replaces a project definition. `force` bypasses server-side safety
    /// checks such as a deployment in progress.
    fn update(
        &self,
        project: &str,
        update: &Project,
        force: bool,
    ) -> impl Future<Output = Result<Response<Project>>> + Send;

    /// Deletes a project.
    fn delete(
        &self,
        project: &str,
        force: bool,
    ) -> impl Future<Output = Result<Response<StatusResponse>>> + Send;

    /// Streams the logs of every app in a project. A `limit` of zero leaves
    /// the count to the server.
    fn get_logs(&self, project: &str, limit: usize) -> LogStream;
}

/// Operations on services within a project.
pub trait Services: Send + Sync {
    /// Lists the services of a project.
    fn list(&self, project: &str) -> impl Future<Output = Result<Response<Vec<Service>>>> + Send;

    /// Fetches one service.
    fn get(
        &self,
        project: &str,
        service: &str,
    ) -> impl Future<Output = Result<Response<Service>>> + Send;

    /// Deletes a service.
    fn delete(
        &self,
        project: &str,
        service: &str,
        force: bool,
    ) -> impl Future<Output = Result<Response<StatusResponse>>> + Send;

    /// Streams the logs of every app in a service.
    fn get_logs(&self, project: &str, service: &str, limit: usize) -> LogStream;
}

/// Operations on apps within a service.
pub trait Apps: Send + Sync {
    /// Lists the apps of a service.
    fn list(
        &self,
        project: &str,
        service: &str,
    ) -> impl Future<Output = Result<Response<Vec<App>>>> + Send;

    /// Fetches one app.
    fn get(
        &self,
        project: &str,
        service: &str,
        app: &str,
    ) -> impl Future<Output = Result<Response<App>>> + Send;

    /// Patches an app. Absent fields keep their current value.
    ///
    /// Empty collections are not sent on the wire, so they also count as
    /// absent: an update cannot clear port mappings, volumes, env or
    /// dependencies. Delete and recreate the app for that.
    fn update(
        &self,
        project: &str,
        service: &str,
        app: &str,
        update: &App,
        force: bool,
    ) -> impl Future<Output = Result<Response<App>>> + Send;

    /// Deletes an app.
    fn delete(
        &self,
        project: &str,
        service: &str,
        app: &str,
        force: bool,
    ) -> impl Future<Output = Result<Response<StatusResponse>>> + Send;

    /// Changes the instance count.
    fn scale(
        &self,
        project: &str,
        service: &str,
        app: &str,
        instances: u32,
    ) -> impl Future<Output = Result<Response<App>>> + Send;

    /// Redeploys a previously deployed version.
    fn rollback(
        &self,
        project: &str,
        service: &str,
        app: &str,
        version: &str,
    ) -> impl Future<Output = Result<Response<App>>> + Send;

    /// Restarts every instance.
    fn restart(
        &self,
        project: &str,
        service: &str,
        app: &str,
    ) -> impl Future<Output = Result<Response<StatusResponse>>> + Send;

    /// Fetches resource usage metrics.
    fn get_metrics(
        &self,
        project: &str,
        service: &str,
        app: &str,
    ) -> impl Future<Output = Result<Response<Metrics>>> + Send;

    /// Streams the logs of one app.
    fn get_logs(&self, project: &str, service: &str, app: &str, limit: usize) -> LogStream;
}

/// The account's container registry credentials.
pub trait RegistryCredentials: Send + Sync {
    /// Uploads a credentials document, forwarded verbatim.
    fn upload<R>(&self, reader: R) -> impl Future<Output = Result<Response<StatusResponse>>> + Send
    where
        R: AsyncRead + Unpin + Send;

    /// Removes stored credentials.
    fn delete(&self) -> impl Future<Output = Result<Response<StatusResponse>>> + Send;

    /// Reports whether credentials are stored. Absent credentials are a
    /// not-found failure.
    fn check(&self) -> impl Future<Output = Result<Response<StatusResponse>>> + Send;
}
