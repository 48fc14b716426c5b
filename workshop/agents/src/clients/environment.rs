use aws_sdk_cloud9::error::{
    CreateEnvironmentEC2Error, CreateEnvironmentEC2ErrorKind, DeleteEnvironmentError,
    DeleteEnvironmentErrorKind, DescribeEnvironmentStatusError, DescribeEnvironmentStatusErrorKind,
};
use aws_sdk_cloud9::model::{
    EnvironmentStatus as SdkEnvironmentStatus, ManagedCredentialsAction, MemberPermissions, Tag,
};
use aws_sdk_cloud9::output::{DeleteEnvironmentOutput, DescribeEnvironmentStatusOutput};
use aws_sdk_cloud9::types::SdkError;
use aws_types::SdkConfig;
use lifecycle_agent::provider::{FailureKind, IntoProviderError, ProviderResult};
use workshop_types::ConnectionType;

/// Inputs for one environment-creation attempt.
#[derive(Clone, Debug)]
pub struct CreateEnvironmentRequest {
    pub name: String,
    pub instance_type: String,
    pub description: Option<String>,
    pub connection_type: Option<ConnectionType>,
    pub image_id: Option<String>,
    pub automatic_stop_time_minutes: i32,
    /// Tag placed on the environment so its EC2 instance can be discovered.
    pub tag_key: String,
    pub tag_value: String,
}

/// The outcome of one environment-creation attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EnvironmentCreation {
    Created(String),

    /// The provider rejected this candidate for capacity or limit reasons; the message says
    /// why. Another candidate may still succeed.
    Rejected(String),
}

/// An environment's lifecycle status as observed through polling. The provider is the source
/// of truth; nothing is cached between observations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EnvironmentStatus {
    Creating,
    Ready,
    Deleting,
    NotFound,
    Other(String),
}

/// The outcome of issuing an environment deletion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EnvironmentDeletion {
    /// The deletion was accepted and is in progress.
    Deleting,

    /// The environment was already gone.
    NotFound,
}

/// Operations on the Cloud9 environment API.
#[async_trait::async_trait]
pub trait EnvironmentClient: Send + Sync {
    async fn create_environment(
        &self,
        request: &CreateEnvironmentRequest,
    ) -> ProviderResult<EnvironmentCreation>;

    /// Grant `member_arn` read-write access to the environment.
    async fn add_member(&self, environment_id: &str, member_arn: &str) -> ProviderResult<()>;

    async fn environment_status(&self, environment_id: &str) -> ProviderResult<EnvironmentStatus>;

    /// Turn off the provider-managed credential injection. Required before a custom instance
    /// profile can take over the instance's credentials.
    async fn disable_managed_credentials(&self, environment_id: &str) -> ProviderResult<()>;

    async fn delete_environment(
        &self,
        environment_id: &str,
    ) -> ProviderResult<EnvironmentDeletion>;

    /// Resolve an environment id by name. `None` when no environment carries the name.
    async fn find_environment_by_name(&self, name: &str) -> ProviderResult<Option<String>>;
}

/// The [`EnvironmentClient`] backed by the Cloud9 API.
#[derive(Clone)]
pub struct Cloud9Environments {
    client: aws_sdk_cloud9::Client,
}

impl Cloud9Environments {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloud9::Client::new(config),
        }
    }
}

#[async_trait::async_trait]
impl EnvironmentClient for Cloud9Environments {
    async fn create_environment(
        &self,
        request: &CreateEnvironmentRequest,
    ) -> ProviderResult<EnvironmentCreation> {
        let mut builder = self
            .client
            .create_environment_ec2()
            .name(&request.name)
            .instance_type(&request.instance_type)
            .automatic_stop_time_minutes(request.automatic_stop_time_minutes)
            .tags(
                Tag::builder()
                    .key(&request.tag_key)
                    .value(&request.tag_value)
                    .build(),
            );
        if let Some(description) = &request.description {
            builder = builder.description(description);
        }
        if let Some(connection_type) = request.connection_type {
            builder = builder.connection_type(sdk_connection_type(connection_type));
        }
        if let Some(image_id) = &request.image_id {
            builder = builder.image_id(image_id);
        }

        match builder.send().await {
            Ok(output) => {
                let environment_id = output.environment_id().context(
                    FailureKind::Provider,
                    "The creation response carries no environment id",
                )?;
                Ok(EnvironmentCreation::Created(environment_id.to_string()))
            }
            Err(e) => {
                if let Some(message) = capacity_rejection(&e) {
                    return Ok(EnvironmentCreation::Rejected(message));
                }
                Err(e).context(
                    FailureKind::Provider,
                    format!("Unable to create environment '{}'", request.name),
                )
            }
        }
    }

    async fn add_member(&self, environment_id: &str, member_arn: &str) -> ProviderResult<()> {
        self.client
            .create_environment_membership()
            .environment_id(environment_id)
            .user_arn(member_arn)
            .permissions(MemberPermissions::ReadWrite)
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!(
                    "Unable to add member '{}' to environment '{}'",
                    member_arn, environment_id
                ),
            )?;
        Ok(())
    }

    async fn environment_status(&self, environment_id: &str) -> ProviderResult<EnvironmentStatus> {
        let result = self
            .client
            .describe_environment_status()
            .environment_id(environment_id)
            .send()
            .await;
        if status_not_found(&result) {
            return Ok(EnvironmentStatus::NotFound);
        }
        let output = result.context(
            FailureKind::Provider,
            format!(
                "Unable to describe the status of environment '{}'",
                environment_id
            ),
        )?;
        Ok(match output.status() {
            Some(SdkEnvironmentStatus::Creating) => EnvironmentStatus::Creating,
            Some(SdkEnvironmentStatus::Ready) => EnvironmentStatus::Ready,
            Some(SdkEnvironmentStatus::Deleting) => EnvironmentStatus::Deleting,
            Some(other) => EnvironmentStatus::Other(other.as_str().to_string()),
            None => EnvironmentStatus::Other("unreported".to_string()),
        })
    }

    async fn disable_managed_credentials(&self, environment_id: &str) -> ProviderResult<()> {
        self.client
            .update_environment()
            .environment_id(environment_id)
            .managed_credentials_action(ManagedCredentialsAction::Disable)
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!(
                    "Unable to disable managed credentials on environment '{}'",
                    environment_id
                ),
            )?;
        Ok(())
    }

    async fn delete_environment(
        &self,
        environment_id: &str,
    ) -> ProviderResult<EnvironmentDeletion> {
        let result = self
            .client
            .delete_environment()
            .environment_id(environment_id)
            .send()
            .await;
        if delete_not_found(&result) {
            return Ok(EnvironmentDeletion::NotFound);
        }
        let _ = result.context(
            FailureKind::Provider,
            format!("Unable to delete environment '{}'", environment_id),
        )?;
        Ok(EnvironmentDeletion::Deleting)
    }

    async fn find_environment_by_name(&self, name: &str) -> ProviderResult<Option<String>> {
        let mut environment_ids = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .list_environments()
                .set_next_token(next_token)
                .send()
                .await
                .context(FailureKind::Provider, "Unable to list environments")?;
            if let Some(ids) = output.environment_ids() {
                environment_ids.extend(ids.iter().cloned());
            }
            next_token = output.next_token().map(String::from);
            if next_token.is_none() {
                break;
            }
        }
        if environment_ids.is_empty() {
            return Ok(None);
        }

        let output = self
            .client
            .describe_environments()
            .set_environment_ids(Some(environment_ids))
            .send()
            .await
            .context(FailureKind::Provider, "Unable to describe environments")?;
        Ok(output
            .environments()
            .unwrap_or_default()
            .iter()
            .find(|environment| environment.name() == Some(name))
            .and_then(|environment| environment.id().map(String::from)))
    }
}

fn sdk_connection_type(connection_type: ConnectionType) -> aws_sdk_cloud9::model::ConnectionType {
    match connection_type {
        ConnectionType::ConnectSsh => aws_sdk_cloud9::model::ConnectionType::ConnectSsh,
        ConnectionType::ConnectSsm => aws_sdk_cloud9::model::ConnectionType::ConnectSsm,
    }
}

// ConflictException and LimitExceededException mean this candidate cannot be created right
// now; any other error is terminal for the whole create.
fn capacity_rejection(error: &SdkError<CreateEnvironmentEC2Error>) -> Option<String> {
    if let SdkError::ServiceError(service_error) = error {
        if matches!(
            &service_error.err().kind,
            CreateEnvironmentEC2ErrorKind::ConflictException(_)
                | CreateEnvironmentEC2ErrorKind::LimitExceededException(_)
        ) {
            return Some(service_error.err().to_string());
        }
    }
    None
}

fn status_not_found(
    result: &std::result::Result<
        DescribeEnvironmentStatusOutput,
        SdkError<DescribeEnvironmentStatusError>,
    >,
) -> bool {
    if let Err(SdkError::ServiceError(service_error)) = result {
        if matches!(
            &service_error.err().kind,
            DescribeEnvironmentStatusErrorKind::NotFoundException(_)
        ) {
            return true;
        }
    }
    false
}

fn delete_not_found(
    result: &std::result::Result<DeleteEnvironmentOutput, SdkError<DeleteEnvironmentError>>,
) -> bool {
    if let Err(SdkError::ServiceError(service_error)) = result {
        if matches!(
            &service_error.err().kind,
            DeleteEnvironmentErrorKind::NotFoundException(_)
        ) {
            return true;
        }
    }
    false
}
