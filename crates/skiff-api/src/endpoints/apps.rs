use reqwest::Method;
use serde_json::json;

use super::Apps;
use crate::client::Client;
use crate::error::Result;
use crate::logs::{LogScope, LogStream};
use crate::metrics::Metrics;
use crate::transport::{ApiRequest, Response, Transport};
use crate::types::{App, ResourceKind, StatusResponse};
use crate::validation::{Mode, validate_app, validate_path, validate_version};

/// Path of one app plus any trailing action segment.
fn app_path(project: &str, service: &str, app: &str, action: Option<&str>) -> Result<Vec<String>> {
    validate_path(&[
        (ResourceKind::Project, project),
        (ResourceKind::Service, service),
        (ResourceKind::App, app),
    ])?;

    let mut path: Vec<String> = ["projects", project, "services", service, "apps", app]
        .into_iter()
        .map(String::from)
        .collect();
    path.extend(action.map(String::from));
    Ok(path)
}

impl<T: Transport> Apps for Client<T> {
    async fn list(&self, project: &str, service: &str) -> Result<Response<Vec<App>>> {
        validate_path(&[(ResourceKind::Project, project), (ResourceKind::Service, service)])?;
        self.call(ApiRequest::new(
            Method::GET,
            ["projects", project, "services", service, "apps"],
        ))
        .await
    }

    async fn get(&self, project: &str, service: &str, app: &str) -> Result<Response<App>> {
        let path = app_path(project, service, app, None)?;
        self.call(ApiRequest::new(Method::GET, path)).await
    }

    async fn update(
        &self,
        project: &str,
        service: &str,
        app: &str,
        update: &App,
        force: bool,
    ) -> Result<Response<App>> {
        let path = app_path(project, service, app, None)?;
        validate_app(update, Mode::Update)?;
        let request = ApiRequest::new(Method::PATCH, path)
            .with_force(force)
            .with_json(update)?;
        self.call(request).await
    }

    async fn delete(
        &self,
        project: &str,
        service: &str,
        app: &str,
        force: bool,
    ) -> Result<Response<StatusResponse>> {
        let path = app_path(project, service, app, None)?;
        self.call(ApiRequest::new(Method::DELETE, path).with_force(force))
            .await
    }

    async fn scale(
        &self,
        project: &str,
        service: &str,
        app: &str,
        instances: u32,
    ) -> Result<Response<App>> {
        let path = app_path(project, service, app, None)?;
        let request =
            ApiRequest::new(Method::PATCH, path).with_json(&json!({ "instances": instances }))?;
        self.call(request).await
    }

    async fn rollback(
        &self,
        project: &str,
        service: &str,
        app: &str,
        version: &str,
    ) -> Result<Response<App>> {
        let path = app_path(project, service, app, Some("rollback"))?;
        validate_version(version)?;
        let request =
            ApiRequest::new(Method::POST, path).with_json(&json!({ "version": version }))?;
        self.call(request).await
    }

    async fn restart(&self, project: &str, service: &str, app: &str) -> Result<Response<StatusResponse>> {
        let path = app_path(project, service, app, Some("restart"))?;
        self.call(ApiRequest::new(Method::POST, path)).await
    }

    async fn get_metrics(&self, project: &str, service: &str, app: &str) -> Result<Response<Metrics>> {
        let path = app_path(project, service, app, Some("metrics"))?;
        self.call(ApiRequest::new(Method::GET, path)).await
    }

    fn get_logs(&self, project: &str, service: &str, app: &str, limit: usize) -> LogStream {
        self.stream_logs(LogScope::app(project, service, app), limit)
    }
}
