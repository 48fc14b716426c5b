use aws_sdk_iam::error::{
    GetInstanceProfileError, GetInstanceProfileErrorKind, GetRoleError, GetRoleErrorKind,
};
use aws_sdk_iam::output::{GetInstanceProfileOutput, GetRoleOutput};
use aws_sdk_iam::types::SdkError;
use aws_types::SdkConfig;
use lifecycle_agent::provider::{FailureKind, IntoProviderError, ProviderResult};

/// What we need to know about an existing instance profile.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceProfileRecord {
    pub arn: String,
    pub role_names: Vec<String>,
}

/// Operations on the IAM API.
#[async_trait::async_trait]
pub trait IdentityClient: Send + Sync {
    /// Whether a role named `name` exists. Absence is a normal outcome, not an error.
    async fn role_exists(&self, name: &str) -> ProviderResult<bool>;

    async fn create_role(&self, name: &str, trust_policy: &str, path: &str)
        -> ProviderResult<()>;

    /// The ARNs of the managed policies attached to `role_name`.
    async fn attached_policy_arns(&self, role_name: &str) -> ProviderResult<Vec<String>>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ProviderResult<()>;

    async fn get_instance_profile(
        &self,
        name: &str,
    ) -> ProviderResult<Option<InstanceProfileRecord>>;

    async fn create_instance_profile(&self, name: &str, path: &str) -> ProviderResult<()>;

    async fn add_role_to_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> ProviderResult<()>;
}

/// The [`IdentityClient`] backed by the IAM API.
#[derive(Clone)]
pub struct IamResources {
    client: aws_sdk_iam::Client,
}

impl IamResources {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_iam::Client::new(config),
        }
    }
}

#[async_trait::async_trait]
impl IdentityClient for IamResources {
    async fn role_exists(&self, name: &str) -> ProviderResult<bool> {
        let result = self.client.get_role().role_name(name).send().await;
        if role_not_found(&result) {
            return Ok(false);
        }
        let _ = result.context(
            FailureKind::Provider,
            format!("Unable to look up role '{}'", name),
        )?;
        Ok(true)
    }

    async fn create_role(
        &self,
        name: &str,
        trust_policy: &str,
        path: &str,
    ) -> ProviderResult<()> {
        self.client
            .create_role()
            .role_name(name)
            .assume_role_policy_document(trust_policy)
            .path(path)
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!("Unable to create role '{}'", name),
            )?;
        Ok(())
    }

    async fn attached_policy_arns(&self, role_name: &str) -> ProviderResult<Vec<String>> {
        let output = self
            .client
            .list_attached_role_policies()
            .role_name(role_name)
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!("Unable to list the policies attached to role '{}'", role_name),
            )?;
        Ok(output
            .attached_policies()
            .unwrap_or_default()
            .iter()
            .filter_map(|policy| policy.policy_arn().map(String::from))
            .collect())
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> ProviderResult<()> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn)
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!(
                    "Unable to attach policy '{}' to role '{}'",
                    policy_arn, role_name
                ),
            )?;
        Ok(())
    }

    async fn get_instance_profile(
        &self,
        name: &str,
    ) -> ProviderResult<Option<InstanceProfileRecord>> {
        let result = self
            .client
            .get_instance_profile()
            .instance_profile_name(name)
            .send()
            .await;
        if profile_not_found(&result) {
            return Ok(None);
        }
        let output = result.context(
            FailureKind::Provider,
            format!("Unable to look up instance profile '{}'", name),
        )?;
        let profile = output.instance_profile().context(
            FailureKind::Provider,
            format!("The lookup response for instance profile '{}' is empty", name),
        )?;
        Ok(Some(InstanceProfileRecord {
            arn: profile
                .arn()
                .context(
                    FailureKind::Provider,
                    format!("Instance profile '{}' carries no arn", name),
                )?
                .to_string(),
            role_names: profile
                .roles()
                .unwrap_or_default()
                .iter()
                .filter_map(|role| role.role_name().map(String::from))
                .collect(),
        }))
    }

    async fn create_instance_profile(&self, name: &str, path: &str) -> ProviderResult<()> {
        self.client
            .create_instance_profile()
            .instance_profile_name(name)
            .path(path)
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!("Unable to create instance profile '{}'", name),
            )?;
        Ok(())
    }

    async fn add_role_to_instance_profile(
        &self,
        profile_name: &str,
        role_name: &str,
    ) -> ProviderResult<()> {
        self.client
            .add_role_to_instance_profile()
            .instance_profile_name(profile_name)
            .role_name(role_name)
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!(
                    "Unable to add role '{}' to instance profile '{}'",
                    role_name, profile_name
                ),
            )?;
        Ok(())
    }
}

fn role_not_found(
    result: &std::result::Result<GetRoleOutput, SdkError<GetRoleError>>,
) -> bool {
    if let Err(SdkError::ServiceError(service_error)) = result {
        if matches!(
            &service_error.err().kind,
            GetRoleErrorKind::NoSuchEntityException(_)
        ) {
            return true;
        }
    }
    false
}

fn profile_not_found(
    result: &std::result::Result<GetInstanceProfileOutput, SdkError<GetInstanceProfileError>>,
) -> bool {
    if let Err(SdkError::ServiceError(service_error)) = result {
        if matches!(
            &service_error.err().kind,
            GetInstanceProfileErrorKind::NoSuchEntityException(_)
        ) {
            return true;
        }
    }
    false
}
