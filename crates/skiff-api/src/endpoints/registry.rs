use reqwest::Method;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use super::RegistryCredentials;
use crate::client::Client;
use crate::error::Result;
use crate::transport::{ApiRequest, Response, Transport};
use crate::types::StatusResponse;

const REGISTRY_CREDENTIALS: &str = "registrycredentials";

impl<T: Transport> RegistryCredentials for Client<T> {
    async fn upload<R>(&self, mut reader: R) -> Result<Response<StatusResponse>>
    where
        R: AsyncRead + Unpin + Send,
    {
        // Fail on a missing token before consuming the caller's reader.
        let request = self.authorize(ApiRequest::new(Method::PUT, [REGISTRY_CREDENTIALS]))?;

        let mut document = Vec::new();
        reader.read_to_end(&mut document).await?;
        debug!(bytes = document.len(), "uploading registry credentials");

        self.call(request.with_raw(document, "application/json"))
            .await
    }

    async fn delete(&self) -> Result<Response<StatusResponse>> {
        self.call(ApiRequest::new(Method::DELETE, [REGISTRY_CREDENTIALS]))
            .await
    }

    async fn check(&self) -> Result<Response<StatusResponse>> {
        self.call(ApiRequest::new(Method::GET, [REGISTRY_CREDENTIALS]))
            .await
    }
}
