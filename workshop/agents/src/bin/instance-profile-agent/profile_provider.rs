use lifecycle_agent::provider::{
    FailureKind, IntoProviderError, ProviderResult, ProvisionOutput, ProvisionRequest,
};
use lifecycle_agent::ResourceProvider;
use log::{debug, info};
use std::collections::BTreeMap;
use workshop_agents::clients::{
    attach_profile, ComputeClient, EnvironmentClient, ProfileHandle,
};
use workshop_types::InstanceProfileConfig;

/// Cloud9 tags every environment instance with the environment's id under this key.
const CLOUD9_ENVIRONMENT_TAG: &str = "aws:cloud9:environment";

/// Swaps the instance profile of a Cloud9 environment's instance. The environment is resolved
/// by name and its instance by the Cloud9 environment tag.
pub struct InstanceProfileProvider<E, C>
where
    E: EnvironmentClient,
    C: ComputeClient,
{
    environment: E,
    compute: C,
}

impl<E, C> InstanceProfileProvider<E, C>
where
    E: EnvironmentClient,
    C: ComputeClient,
{
    pub fn new(environment: E, compute: C) -> Self {
        Self {
            environment,
            compute,
        }
    }
}

#[async_trait::async_trait]
impl<E, C> ResourceProvider for InstanceProfileProvider<E, C>
where
    E: EnvironmentClient,
    C: ComputeClient,
{
    type Properties = InstanceProfileConfig;

    async fn create(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        let config = &request.properties;

        let environment_id = self
            .environment
            .find_environment_by_name(&config.environment_name)
            .await?
            .context(
                FailureKind::Provider,
                format!("No environment is named '{}'", config.environment_name),
            )?;
        debug!("environment_id: {}", environment_id);

        let instance_id = self
            .compute
            .find_running_instance(CLOUD9_ENVIRONMENT_TAG, &environment_id)
            .await?
            .context(
                FailureKind::Provider,
                format!(
                    "No running instance belongs to environment '{}'",
                    environment_id
                ),
            )?;
        debug!("instance_id: {}", instance_id);

        attach_profile(
            &self.compute,
            &instance_id,
            &ProfileHandle::Arn(config.instance_profile_arn.clone()),
        )
        .await?;

        let mut data = BTreeMap::new();
        data.insert("instanceId".to_string(), instance_id.clone());
        Ok(ProvisionOutput {
            physical_resource_id: instance_id,
            data,
        })
    }

    /// Re-applying the association converges on the same state, so updates mutate in place
    /// instead of the default destroy-then-recreate.
    async fn update(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        self.create(request).await
    }

    /// The association dies with the instance; there is nothing to clean up.
    async fn delete(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        let physical_id = request.require_physical_id()?.to_string();
        info!("Nothing to delete for '{}'", physical_id);
        let mut data = BTreeMap::new();
        data.insert("status".to_string(), "nothing to delete".to_string());
        Ok(ProvisionOutput {
            physical_resource_id: physical_id,
            data,
        })
    }
}
