use reqwest::Method;

use super::Projects;
use crate::client::Client;
use crate::error::Result;
use crate::logs::{LogScope, LogStream};
use crate::transport::{ApiRequest, Response, Transport};
use crate::types::{Project, ResourceKind, StatusResponse};
use crate::validation::{validate_path, validate_project};

const PROJECTS: &str = "projects";

impl<T: Transport> Projects for Client<T> {
    async fn create(&self, project: &Project) -> Result<Response<Project>> {
        validate_project(project)?;
        self.call(ApiRequest::new(Method::POST, [PROJECTS]).with_json(project)?)
            .await
    }

    async fn list(&self) -> Result<Response<Vec<Project>>> {
        self.call(ApiRequest::new(Method::GET, [PROJECTS])).await
    }

    async fn get(&self, project: &str) -> Result<Response<Project>> {
        validate_path(&[(ResourceKind::Project, project)])?;
        self.call(ApiRequest::new(Method::GET, [PROJECTS, project]))
            .await
    }

    async fn update(&self, project: &str, update: &Project, force: bool) -> Result<Response<Project>> {
        validate_path(&[(ResourceKind::Project, project)])?;
        validate_project(update)?;
        let request = ApiRequest::new(Method::PATCH, [PROJECTS, project])
            .with_force(force)
            .with_json(update)?;
        self.call(request).await
    }

    async fn delete(&self, project: &str, force: bool) -> Result<Response<StatusResponse>> {
        validate_path(&[(ResourceKind::Project, project)])?;
        self.call(ApiRequest::new(Method::DELETE, [PROJECTS, project]).with_force(force))
            .await
    }

    fn get_logs(&self, project: &str, limit: usize) -> LogStream {
        self.stream_logs(LogScope::project(project), limit)
    }
}
