/*!

The `agent` module defines the `Agent` object which provides the end-to-end program of a
custom-resource handler.

!*/

use crate::clients::CallbackClient;
use crate::envelope::RequestType;
use crate::error::AgentResult;
use crate::provider::{FailureKind, IntoProviderError, ProvisionRequest, ResourceProvider};
use crate::BootstrapData;
use log::{error, info};

/// The physical id reported when a create fails before a real one exists. CloudFormation
/// requires some id in a FAILED response in order to route the rollback delete.
pub const FALLBACK_PHYSICAL_ID: &str = "resource-not-created";

/// The `Agent` drives the main program of a custom-resource handler.
///
/// ## Dependency Injection for Testing
///
/// The provider and the callback client are both constructed by the caller and injected here,
/// so tests can substitute fakes for either without touching process-wide state. In practice
/// you will construct your provider with real AWS clients and pass a [`DefaultCallbackClient`].
pub struct Agent<P, C>
where
    P: ResourceProvider,
    C: CallbackClient,
{
    request_type: RequestType,
    request: ProvisionRequest<P::Properties>,
    provider: P,
    callback: C,
}

impl<P, C> Agent<P, C>
where
    P: ResourceProvider,
    C: CallbackClient,
{
    /// Create a new `Agent` from the bootstrap data and the injected collaborators. The typed
    /// properties are parsed here: a property bag that does not deserialize fails the
    /// invocation before the provider sees it.
    pub async fn new(data: BootstrapData, provider: P, callback: C) -> AgentResult<Self> {
        let properties: P::Properties =
            match serde_json::from_value(data.event.resource_properties.clone()).context(
                FailureKind::Validation,
                "Unable to parse the resource properties",
            ) {
                Ok(ok) => ok,
                Err(e) => {
                    let physical_id = data
                        .event
                        .physical_resource_id
                        .as_deref()
                        .unwrap_or(FALLBACK_PHYSICAL_ID);
                    if let Err(send_error) = callback.send_failure(physical_id, &e.to_string()).await
                    {
                        error!(
                            "Unable to report failure to CloudFormation: {}",
                            send_error
                        );
                    }
                    return Err(e.into());
                }
            };

        Ok(Self {
            request_type: data.event.request_type,
            request: ProvisionRequest {
                physical_resource_id: data.event.physical_resource_id.clone(),
                properties,
            },
            provider,
            callback,
        })
    }

    /// Service the lifecycle request and report the outcome to CloudFormation.
    pub async fn run(&self) -> AgentResult<()> {
        info!("Handling '{:?}' request", self.request_type);
        let outcome = match self.request_type {
            RequestType::Create => self.provider.create(&self.request).await,
            RequestType::Update => self.provider.update(&self.request).await,
            RequestType::Delete => self.provider.delete(&self.request).await,
        };

        match outcome {
            Ok(output) => Ok(self.callback.send_success(&output).await?),
            Err(e) => {
                let physical_id = self
                    .request
                    .physical_resource_id
                    .as_deref()
                    .unwrap_or(FALLBACK_PHYSICAL_ID);
                if let Err(client_error) =
                    self.callback.send_failure(physical_id, &e.to_string()).await
                {
                    error!(
                        "Unable to report failure to CloudFormation: {}",
                        client_error
                    );
                    error!("The failure we could not report is: {}", e);
                }
                Err(e.into())
            }
        }
    }
}
