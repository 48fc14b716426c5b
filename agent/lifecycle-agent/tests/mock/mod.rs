/*!

This test module provides a mock implementation of the [`CallbackClient`] along with a scripted
[`ResourceProvider`], demonstrating how an agent binary can be tested without CloudFormation
behind it.

!*/

pub(crate) mod callback_client;

use lifecycle_agent::provider::{
    FailureKind, Properties, ProviderError, ProviderResult, ProvisionOutput, ProvisionRequest,
};
use lifecycle_agent::{BootstrapData, CustomResourceEvent, RequestType, ResourceProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetProperties {
    pub fleet_name: String,

    /// When set, `create` fails with a scripted error.
    #[serde(default)]
    pub fail_create: bool,
}

impl Properties for FleetProperties {}

/// `FleetProvider` pretends to manage a fleet of instances, recording every call it receives so
/// tests can assert on dispatch and ordering.
pub struct FleetProvider {
    pub calls: Arc<Mutex<Vec<String>>>,
    sequence: AtomicU32,
}

impl FleetProvider {
    pub fn new(calls: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            calls,
            sequence: AtomicU32::new(0),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl ResourceProvider for FleetProvider {
    type Properties = FleetProperties;

    async fn create(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        self.record(format!("create:{}", request.properties.fleet_name));
        if request.properties.fail_create {
            return Err(ProviderError::new_with_context(
                FailureKind::Provider,
                "Scripted create failure",
            ));
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let mut data = BTreeMap::new();
        data.insert(
            "fleetName".to_string(),
            request.properties.fleet_name.clone(),
        );
        Ok(ProvisionOutput {
            physical_resource_id: format!("fleet-{}", sequence),
            data,
        })
    }

    async fn delete(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        let physical_id = request.require_physical_id()?;
        self.record(format!("delete:{}", physical_id));
        Ok(ProvisionOutput {
            physical_resource_id: physical_id.to_string(),
            data: BTreeMap::new(),
        })
    }
}

/// Assemble the bootstrap data an invocation runtime would have produced.
pub fn bootstrap_data(
    request_type: RequestType,
    physical_resource_id: Option<&str>,
    resource_properties: serde_json::Value,
) -> BootstrapData {
    BootstrapData {
        event: CustomResourceEvent {
            request_type,
            response_url: "https://cloudformation-custom-resource-response.example/signed"
                .to_string(),
            stack_id: "arn:aws:cloudformation:us-west-2:111122223333:stack/mock/guid".to_string(),
            request_id: "mock-request".to_string(),
            logical_resource_id: "MockFleet".to_string(),
            resource_type: Some("Custom::MockFleet".to_string()),
            physical_resource_id: physical_resource_id.map(String::from),
            resource_properties,
            old_resource_properties: None,
        },
    }
}
