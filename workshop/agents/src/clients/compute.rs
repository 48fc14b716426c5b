use aws_sdk_ec2::model::{
    Filter, IamInstanceProfileSpecification, InstanceStatusSummary, SummaryStatus,
};
use aws_types::SdkConfig;
use lifecycle_agent::provider::{FailureKind, IntoProviderError, ProviderResult};
use log::info;

/// An instance profile referenced by name or by ARN; the provider accepts either in an
/// association.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProfileHandle {
    Name(String),
    Arn(String),
}

impl ProfileHandle {
    pub fn as_str(&self) -> &str {
        match self {
            ProfileHandle::Name(name) => name,
            ProfileHandle::Arn(arn) => arn,
        }
    }

    fn specification(&self) -> IamInstanceProfileSpecification {
        match self {
            ProfileHandle::Name(name) => {
                IamInstanceProfileSpecification::builder().name(name).build()
            }
            ProfileHandle::Arn(arn) => IamInstanceProfileSpecification::builder().arn(arn).build(),
        }
    }
}

/// Operations on the EC2 API.
#[async_trait::async_trait]
pub trait ComputeClient: Send + Sync {
    /// Find a running instance carrying `tag_key=tag_value`. The first match wins.
    async fn find_running_instance(
        &self,
        tag_key: &str,
        tag_value: &str,
    ) -> ProviderResult<Option<String>>;

    /// The instance's current instance-profile association id, if it has one. An instance has
    /// at most one association.
    async fn profile_association(&self, instance_id: &str) -> ProviderResult<Option<String>>;

    async fn replace_profile_association(
        &self,
        association_id: &str,
        profile: &ProfileHandle,
    ) -> ProviderResult<()>;

    async fn associate_profile(
        &self,
        instance_id: &str,
        profile: &ProfileHandle,
    ) -> ProviderResult<()>;

    async fn reboot_instance(&self, instance_id: &str) -> ProviderResult<()>;

    /// Whether the instance currently passes both of EC2's status checks.
    async fn instance_status_ok(&self, instance_id: &str) -> ProviderResult<bool>;
}

/// Point `instance_id` at `profile`: replace the existing association when the instance has
/// one, otherwise create a new association.
pub async fn attach_profile<C>(
    compute: &C,
    instance_id: &str,
    profile: &ProfileHandle,
) -> ProviderResult<()>
where
    C: ComputeClient,
{
    match compute.profile_association(instance_id).await? {
        Some(association_id) => {
            info!(
                "Replacing association '{}' on instance '{}' with profile '{}'",
                association_id,
                instance_id,
                profile.as_str()
            );
            compute
                .replace_profile_association(&association_id, profile)
                .await
        }
        None => {
            info!(
                "Instance '{}' has no instance profile, associating '{}'",
                instance_id,
                profile.as_str()
            );
            compute.associate_profile(instance_id, profile).await
        }
    }
}

/// The [`ComputeClient`] backed by the EC2 API.
#[derive(Clone)]
pub struct Ec2Instances {
    client: aws_sdk_ec2::Client,
}

impl Ec2Instances {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ec2::Client::new(config),
        }
    }
}

#[async_trait::async_trait]
impl ComputeClient for Ec2Instances {
    async fn find_running_instance(
        &self,
        tag_key: &str,
        tag_value: &str,
    ) -> ProviderResult<Option<String>> {
        let output = self
            .client
            .describe_instances()
            .filters(
                Filter::builder()
                    .name(format!("tag:{}", tag_key))
                    .values(tag_value)
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values("running")
                    .build(),
            )
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!(
                    "Unable to describe instances tagged '{}={}'",
                    tag_key, tag_value
                ),
            )?;
        Ok(output
            .reservations()
            .unwrap_or_default()
            .iter()
            .filter_map(|reservation| reservation.instances())
            .flatten()
            .filter_map(|instance| instance.instance_id())
            .next()
            .map(String::from))
    }

    async fn profile_association(&self, instance_id: &str) -> ProviderResult<Option<String>> {
        let output = self
            .client
            .describe_iam_instance_profile_associations()
            .filters(
                Filter::builder()
                    .name("instance-id")
                    .values(instance_id)
                    .build(),
            )
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!(
                    "Unable to describe the profile associations of instance '{}'",
                    instance_id
                ),
            )?;
        Ok(output
            .iam_instance_profile_associations()
            .unwrap_or_default()
            .first()
            .and_then(|association| association.association_id())
            .map(String::from))
    }

    async fn replace_profile_association(
        &self,
        association_id: &str,
        profile: &ProfileHandle,
    ) -> ProviderResult<()> {
        self.client
            .replace_iam_instance_profile_association()
            .association_id(association_id)
            .iam_instance_profile(profile.specification())
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!("Unable to replace profile association '{}'", association_id),
            )?;
        Ok(())
    }

    async fn associate_profile(
        &self,
        instance_id: &str,
        profile: &ProfileHandle,
    ) -> ProviderResult<()> {
        self.client
            .associate_iam_instance_profile()
            .instance_id(instance_id)
            .iam_instance_profile(profile.specification())
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!(
                    "Unable to associate profile '{}' with instance '{}'",
                    profile.as_str(),
                    instance_id
                ),
            )?;
        Ok(())
    }

    async fn reboot_instance(&self, instance_id: &str) -> ProviderResult<()> {
        self.client
            .reboot_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!("Unable to reboot instance '{}'", instance_id),
            )?;
        Ok(())
    }

    async fn instance_status_ok(&self, instance_id: &str) -> ProviderResult<bool> {
        let output = self
            .client
            .describe_instance_status()
            .instance_ids(instance_id)
            .include_all_instances(true)
            .send()
            .await
            .context(
                FailureKind::Provider,
                format!("Unable to describe the status of instance '{}'", instance_id),
            )?;
        Ok(output
            .instance_statuses()
            .unwrap_or_default()
            .first()
            .map_or(false, |status| {
                summary_ok(status.instance_status()) && summary_ok(status.system_status())
            }))
    }
}

fn summary_ok(summary: Option<&InstanceStatusSummary>) -> bool {
    matches!(
        summary.and_then(|summary| summary.status()),
        Some(SummaryStatus::Ok)
    )
}
