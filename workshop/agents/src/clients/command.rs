use aws_sdk_ssm::error::{GetCommandInvocationError, GetCommandInvocationErrorKind};
use aws_sdk_ssm::model::{CloudWatchOutputConfig, CommandInvocationStatus};
use aws_sdk_ssm::output::GetCommandInvocationOutput;
use aws_sdk_ssm::types::SdkError;
use aws_types::SdkConfig;
use lifecycle_agent::provider::{FailureKind, IntoProviderError, ProviderResult};

/// Inputs for one Run Command dispatch.
#[derive(Clone, Debug)]
pub struct CommandDispatch {
    pub instance_id: String,
    pub commands: Vec<String>,
    pub comment: String,

    /// Seconds the service may spend reaching the instance before the command is abandoned.
    pub timeout_seconds: i32,

    /// CloudWatch log group the command output is shipped to.
    pub log_group: String,
}

/// Where a dispatched command currently stands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommandStatus {
    InProgress,
    Success,
    Failed(String),
}

/// Operations on the SSM Run Command API.
#[async_trait::async_trait]
pub trait CommandClient: Send + Sync {
    /// Dispatch a shell script to an instance, returning the command id.
    async fn send_shell_command(&self, dispatch: &CommandDispatch) -> ProviderResult<String>;

    async fn command_status(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> ProviderResult<CommandStatus>;
}

/// The [`CommandClient`] backed by the SSM API.
#[derive(Clone)]
pub struct SsmCommands {
    client: aws_sdk_ssm::Client,
}

impl SsmCommands {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait::async_trait]
impl CommandClient for SsmCommands {
    async fn send_shell_command(&self, dispatch: &CommandDispatch) -> ProviderResult<String> {
        let output = self
            .client
            .send_command()
            .instance_ids(&dispatch.instance_id)
            .document_name("AWS-RunShellScript")
            .document_version("$LATEST")
            .timeout_seconds(dispatch.timeout_seconds)
            .comment(&dispatch.comment)
            .cloud_watch_output_config(
                CloudWatchOutputConfig::builder()
                    .cloud_watch_log_group_name(&dispatch.log_group)
                    .cloud_watch_output_enabled(true)
                    .build(),
            )
            .parameters("commands", dispatch.commands.clone())
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!(
                    "Unable to send the command to instance '{}'",
                    dispatch.instance_id
                ),
            )?;
        output
            .command()
            .and_then(|command| command.command_id())
            .map(String::from)
            .context(
                FailureKind::Provider,
                "The send-command response carries no command id",
            )
    }

    async fn command_status(
        &self,
        command_id: &str,
        instance_id: &str,
    ) -> ProviderResult<CommandStatus> {
        let result = self
            .client
            .get_command_invocation()
            .command_id(command_id)
            .instance_id(instance_id)
            .send()
            .await;
        if invocation_not_visible(&result) {
            // The invocation is not queryable for a short window after SendCommand accepts it.
            return Ok(CommandStatus::InProgress);
        }
        let output = result.context(
            FailureKind::Provider,
            format!("Unable to get the status of command '{}'", command_id),
        )?;
        Ok(match output.status() {
            Some(CommandInvocationStatus::Pending)
            | Some(CommandInvocationStatus::InProgress)
            | Some(CommandInvocationStatus::Delayed) => CommandStatus::InProgress,
            Some(CommandInvocationStatus::Success) => CommandStatus::Success,
            Some(other) => CommandStatus::Failed(format!(
                "Command '{}' finished as '{}': {}",
                command_id,
                other.as_str(),
                output.standard_error_content().unwrap_or_default()
            )),
            None => CommandStatus::Failed(format!("Command '{}' reported no status", command_id)),
        })
    }
}

fn invocation_not_visible(
    result: &std::result::Result<GetCommandInvocationOutput, SdkError<GetCommandInvocationError>>,
) -> bool {
    if let Err(SdkError::ServiceError(service_error)) = result {
        if matches!(
            &service_error.err().kind,
            GetCommandInvocationErrorKind::InvocationDoesNotExist(_)
        ) {
            return true;
        }
    }
    false
}
