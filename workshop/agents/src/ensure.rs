/*!

Idempotent creation of the IAM resources an SSM-connected Cloud9 environment depends on.
Every function checks for existence before mutating, so the full sequence can run any number
of times from any intermediate state and converges to the same linked state.

!*/

use crate::clients::IdentityClient;
use lifecycle_agent::provider::{FailureKind, IntoProviderError, ProviderResult};
use log::info;
use serde_json::json;

/// The role Cloud9 uses to reach environment instances over SSM.
pub const SSM_ACCESS_ROLE_NAME: &str = "AWSCloud9SSMAccessRole";
const SSM_ACCESS_ROLE_PATH: &str = "/service-role/";

/// The managed policy backing the SSM instance profile.
pub const SSM_INSTANCE_PROFILE_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/AWSCloud9SSMInstanceProfile";

/// The instance profile Cloud9 expects on SSM-connected environments.
pub const SSM_INSTANCE_PROFILE_NAME: &str = "AWSCloud9SSMInstanceProfile";
const SSM_INSTANCE_PROFILE_PATH: &str = "/cloud9/";

/// Create the role only if it does not already exist.
pub async fn ensure_role<I>(
    identity: &I,
    name: &str,
    trust_policy: &str,
    path: &str,
) -> ProviderResult<()>
where
    I: IdentityClient,
{
    if identity.role_exists(name).await? {
        info!("Role '{}' already exists", name);
        return Ok(());
    }
    info!("Role '{}' does not exist, creating it", name);
    identity.create_role(name, trust_policy, path).await
}

/// Attach the policy only if it is not already attached.
pub async fn ensure_policy_attached<I>(
    identity: &I,
    role_name: &str,
    policy_arn: &str,
) -> ProviderResult<()>
where
    I: IdentityClient,
{
    let attached = identity.attached_policy_arns(role_name).await?;
    if attached.iter().any(|arn| arn == policy_arn) {
        info!(
            "Policy '{}' is already attached to role '{}'",
            policy_arn, role_name
        );
        return Ok(());
    }
    info!("Attaching policy '{}' to role '{}'", policy_arn, role_name);
    identity.attach_role_policy(role_name, policy_arn).await
}

/// Create the instance profile only if it does not already exist.
pub async fn ensure_instance_profile<I>(identity: &I, name: &str, path: &str) -> ProviderResult<()>
where
    I: IdentityClient,
{
    if identity.get_instance_profile(name).await?.is_some() {
        info!("Instance profile '{}' already exists", name);
        return Ok(());
    }
    info!("Instance profile '{}' does not exist, creating it", name);
    identity.create_instance_profile(name, path).await
}

/// Add the role to the profile only if it is not already a member.
pub async fn ensure_role_in_profile<I>(
    identity: &I,
    profile_name: &str,
    role_name: &str,
) -> ProviderResult<()>
where
    I: IdentityClient,
{
    let profile = identity.get_instance_profile(profile_name).await?.context(
        FailureKind::Provider,
        format!("Instance profile '{}' was expected to exist", profile_name),
    )?;
    if profile.role_names.iter().any(|name| name == role_name) {
        info!(
            "Role '{}' is already in instance profile '{}'",
            role_name, profile_name
        );
        return Ok(());
    }
    info!(
        "Adding role '{}' to instance profile '{}'",
        role_name, profile_name
    );
    identity
        .add_role_to_instance_profile(profile_name, role_name)
        .await
}

/// Ensure the role, policy attachment, instance profile, and profile membership that an
/// SSM-connected Cloud9 environment requires.
pub async fn ensure_ssm_prerequisites<I>(identity: &I) -> ProviderResult<()>
where
    I: IdentityClient,
{
    ensure_role(
        identity,
        SSM_ACCESS_ROLE_NAME,
        &ssm_access_trust_policy(),
        SSM_ACCESS_ROLE_PATH,
    )
    .await?;
    ensure_policy_attached(
        identity,
        SSM_ACCESS_ROLE_NAME,
        SSM_INSTANCE_PROFILE_POLICY_ARN,
    )
    .await?;
    ensure_instance_profile(identity, SSM_INSTANCE_PROFILE_NAME, SSM_INSTANCE_PROFILE_PATH)
        .await?;
    ensure_role_in_profile(identity, SSM_INSTANCE_PROFILE_NAME, SSM_ACCESS_ROLE_NAME).await
}

fn ssm_access_trust_policy() -> String {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": {
                    "Service": ["ec2.amazonaws.com", "cloud9.amazonaws.com"]
                },
                "Action": "sts:AssumeRole"
            }
        ]
    })
    .to_string()
}
