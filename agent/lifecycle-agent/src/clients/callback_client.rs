use super::error::{self, ClientResult};
use crate::envelope::{CustomResourceResponse, ResponseStatus};
use crate::provider::ProvisionOutput;
use crate::BootstrapData;
use log::info;
use snafu::{ensure, ResultExt};
use std::collections::BTreeMap;

/// `CallbackClient` delivers the outcome of a lifecycle request back to CloudFormation.
///
/// This is provided as a trait so that mock implementations can be injected into the [`Agent`]
/// for testing purposes. In practice you will use the [`DefaultCallbackClient`].
#[async_trait::async_trait]
pub trait CallbackClient: Sized + Send + Sync {
    /// Create a new `CallbackClient`.
    fn new(data: &BootstrapData) -> ClientResult<Self>;

    /// Report that the requested lifecycle action succeeded.
    async fn send_success(&self, output: &ProvisionOutput) -> ClientResult<()>;

    /// Report that the requested lifecycle action failed.
    async fn send_failure(&self, physical_resource_id: &str, reason: &str) -> ClientResult<()>;
}

/// Provides the default [`CallbackClient`] implementation: an HTTP `PUT` of the response
/// document to the event's pre-signed response URL.
#[derive(Clone)]
pub struct DefaultCallbackClient {
    http: reqwest::Client,
    response_url: String,
    stack_id: String,
    request_id: String,
    logical_resource_id: String,
}

#[async_trait::async_trait]
impl CallbackClient for DefaultCallbackClient {
    fn new(data: &BootstrapData) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context(error::BuildHttpClientSnafu)?;
        Ok(Self {
            http,
            response_url: data.event.response_url.clone(),
            stack_id: data.event.stack_id.clone(),
            request_id: data.event.request_id.clone(),
            logical_resource_id: data.event.logical_resource_id.clone(),
        })
    }

    async fn send_success(&self, output: &ProvisionOutput) -> ClientResult<()> {
        info!(
            "Reporting success for physical id '{}'",
            output.physical_resource_id
        );
        self.put(CustomResourceResponse {
            status: ResponseStatus::Success,
            reason: None,
            physical_resource_id: output.physical_resource_id.clone(),
            stack_id: self.stack_id.clone(),
            request_id: self.request_id.clone(),
            logical_resource_id: self.logical_resource_id.clone(),
            data: output.data.clone(),
        })
        .await
    }

    async fn send_failure(&self, physical_resource_id: &str, reason: &str) -> ClientResult<()> {
        info!("Reporting failure: {}", reason);
        self.put(CustomResourceResponse {
            status: ResponseStatus::Failed,
            reason: Some(reason.to_string()),
            physical_resource_id: physical_resource_id.to_string(),
            stack_id: self.stack_id.clone(),
            request_id: self.request_id.clone(),
            logical_resource_id: self.logical_resource_id.clone(),
            data: BTreeMap::new(),
        })
        .await
    }
}

impl DefaultCallbackClient {
    async fn put(&self, response: CustomResourceResponse) -> ClientResult<()> {
        let body = serde_json::to_string(&response).context(error::SerializeResponseSnafu)?;
        let reply = self
            .http
            .put(&self.response_url)
            // The response URL is a pre-signed S3 PUT and the signature covers an empty
            // content-type.
            .header("content-type", "")
            .body(body)
            .send()
            .await
            .context(error::DeliverResponseSnafu {
                url: &self.response_url,
            })?;
        ensure!(
            reply.status().is_success(),
            error::ResponseRejectedSnafu {
                url: &self.response_url,
                status: reply.status().as_u16(),
            }
        );
        Ok(())
    }
}
