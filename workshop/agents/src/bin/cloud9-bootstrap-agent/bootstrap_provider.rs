use lifecycle_agent::provider::{
    FailureKind, ProviderError, ProviderResult, ProvisionOutput, ProvisionRequest,
};
use lifecycle_agent::ResourceProvider;
use log::info;
use std::collections::BTreeMap;
use std::time::Duration;
use workshop_agents::clients::{CommandClient, CommandDispatch, CommandStatus, ComputeClient};
use workshop_agents::retry::{wait_until, RetryPolicy};
use workshop_agents::script::bootstrap_commands;
use workshop_types::BootstrapCommandConfig;

const COMMAND_COMMENT: &str =
    "Updates the Cloud9 instance with all tools necessary to run the workshop";
const COMMAND_LOG_GROUP: &str = "cloud9-tools";

/// Seconds SSM may spend reaching the instance before the command is abandoned.
const COMMAND_TIMEOUT_SECONDS: i32 = 30;

/// The cadence of the EC2 instance-status waiter, with an explicit ceiling.
const READINESS_POLL: RetryPolicy = RetryPolicy::new(Duration::from_secs(15), 40);

/// Command completion is checked often; the ceiling is generous because the script downloads
/// toolchains.
const COMMAND_POLL: RetryPolicy = RetryPolicy::new(Duration::from_secs(5), 60);

/// Pushes the one-time bootstrap script to a Cloud9 instance and waits for it to finish.
pub struct BootstrapProvider<C, S>
where
    C: ComputeClient,
    S: CommandClient,
{
    compute: C,
    command: S,

    /// Poll budgets; tests swap in fast ones.
    pub readiness_poll: RetryPolicy,
    pub command_poll: RetryPolicy,
}

impl<C, S> BootstrapProvider<C, S>
where
    C: ComputeClient,
    S: CommandClient,
{
    pub fn new(compute: C, command: S) -> Self {
        Self {
            compute,
            command,
            readiness_poll: READINESS_POLL,
            command_poll: COMMAND_POLL,
        }
    }
}

#[async_trait::async_trait]
impl<C, S> ResourceProvider for BootstrapProvider<C, S>
where
    C: ComputeClient,
    S: CommandClient,
{
    type Properties = BootstrapCommandConfig;

    async fn create(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        let config = &request.properties;

        info!("Waiting for instance '{}' to be ready", config.instance_id);
        wait_until(
            &self.readiness_poll,
            "the instance to pass its status checks",
            || {
                let compute = &self.compute;
                let instance_id = config.instance_id.as_str();
                async move {
                    Ok(compute
                        .instance_status_ok(instance_id)
                        .await?
                        .then(|| ()))
                }
            },
        )
        .await?;

        info!("Sending command to instance '{}'", config.instance_id);
        let command_id = self
            .command
            .send_shell_command(&CommandDispatch {
                instance_id: config.instance_id.clone(),
                commands: bootstrap_commands(
                    &config.cluster_name,
                    &config.region,
                    &config.instance_id,
                    &config.instance_role_arn,
                ),
                comment: COMMAND_COMMENT.to_string(),
                timeout_seconds: COMMAND_TIMEOUT_SECONDS,
                log_group: COMMAND_LOG_GROUP.to_string(),
            })
            .await?;

        info!("Waiting for command '{}' to complete", command_id);
        wait_until(&self.command_poll, "the bootstrap command to complete", || {
            let command = &self.command;
            let command_id = command_id.as_str();
            let instance_id = config.instance_id.as_str();
            async move {
                match command.command_status(command_id, instance_id).await? {
                    CommandStatus::InProgress => Ok(None),
                    CommandStatus::Success => Ok(Some(())),
                    CommandStatus::Failed(message) => Err(ProviderError::new_with_context(
                        FailureKind::Provider,
                        message,
                    )),
                }
            }
        })
        .await?;

        let mut data = BTreeMap::new();
        data.insert("commandId".to_string(), command_id);
        Ok(ProvisionOutput {
            physical_resource_id: config.instance_id.clone(),
            data,
        })
    }

    /// Re-running the script converges on the same tool set, so updates re-apply in place.
    async fn update(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        self.create(request).await
    }

    /// The tools die with the instance; there is nothing to clean up.
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
