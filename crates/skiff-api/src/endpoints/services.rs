use reqwest::Method;

use super::Services;
use crate::client::Client;
use crate::error::Result;
use crate::logs::{LogScope, LogStream};
use crate::transport::{ApiRequest, Response, Transport};
use crate::types::{ResourceKind, Service, StatusResponse};
use crate::validation::validate_path;

fn service_path(project: &str, service: &str) -> Result<[String; 4]> {
    validate_path(&[(ResourceKind::Project, project), (ResourceKind::Service, service)])?;
    Ok([
        "projects".into(),
        project.into(),
        "services".into(),
        service.into(),
    ])
}

impl<T: Transport> Services for Client<T> {
    async fn list(&self, project: &str) -> Result<Response<Vec<Service>>> {
        validate_path(&[(ResourceKind::Project, project)])?;
        self.call(ApiRequest::new(Method::GET, ["projects", project, "services"]))
            .await
    }

    async fn get(&self, project: &str, service: &str) -> Result<Response<Service>> {
        let path = service_path(project, service)?;
        self.call(ApiRequest::new(Method::GET, path)).await
    }

    async fn delete(&self, project: &str, service: &str, force: bool) -> Result<Response<StatusResponse>> {
        let path = service_path(project, service)?;
        self.call(ApiRequest::new(Method::DELETE, path).with_force(force))
            .await
    }

    fn get_logs(&self, project: &str, service: &str, limit: usize) -> LogStream {
        self.stream_logs(LogScope::service(project, service), limit)
    }
}
