use lifecycle_agent::provider::Properties;
use serde::{Deserialize, Serialize};
use serde_plain::{derive_display_from_serialize, derive_fromstr_from_deserialize};

/// How users reach the Cloud9 environment's instance. `ConnectSsm` requires the SSM access
/// role and instance profile to exist; the environment agent ensures them before creating the
/// environment.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionType {
    ConnectSsh,
    ConnectSsm,
}

impl Default for ConnectionType {
    fn default() -> Self {
        Self::ConnectSsm
    }
}

derive_display_from_serialize!(ConnectionType);
derive_fromstr_from_deserialize!(ConnectionType);

/// Property bag for the Cloud9 environment agent.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cloud9EnvironmentConfig {
    /// The name of the Cloud9 environment.
    pub name: String,

    /// The instance profile attached to the environment's instance once it is running.
    pub instance_profile_name: String,

    /// The tag by which the environment's instance is discovered.
    pub instance_tag_key: String,
    pub instance_tag_value: String,

    /// The output-data keys under which the instance id and environment id are published. The
    /// owning stack chooses these so it can feed them into SSM parameters.
    pub instance_id_data_name: String,
    pub env_id_data_name: String,

    /// Candidate instance types in priority order. The first type the provider accepts wins.
    pub instance_types: Vec<String>,

    /// ARN of an identity to add as a read-write environment member.
    pub member_arn: Option<String>,

    pub connection_type: Option<ConnectionType>,

    pub image_id: Option<String>,

    /// Minutes of inactivity before the environment's instance auto-stops.
    pub automatic_stop_time_minutes: Option<i32>,

    pub description: Option<String>,
}

impl Properties for Cloud9EnvironmentConfig {}

/// Property bag for the standalone instance-profile agent, which points an already-running
/// Cloud9 instance at a different instance profile.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProfileConfig {
    /// The name of the Cloud9 environment whose instance is updated.
    pub environment_name: String,

    /// ARN of the instance profile to attach.
    pub instance_profile_arn: String,
}

impl Properties for InstanceProfileConfig {}

/// Property bag for the bootstrap command agent.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapCommandConfig {
    /// The EKS cluster the instance's kubeconfig is pointed at.
    pub cluster_name: String,

    pub region: String,

    /// The instance to bootstrap.
    pub instance_id: String,

    /// The role assumed when writing the kubeconfig.
    pub instance_role_arn: String,
}

impl Properties for BootstrapCommandConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn environment_config_parses_the_cdk_property_bag() {
        let config: Cloud9EnvironmentConfig = serde_json::from_value(json!({
            "name": "eks-saas-workshop",
            "instanceProfileName": "workshop-instance-profile",
            "instanceTagKey": "WORKSHOP",
            "instanceTagValue": "eks-saas",
            "instanceIdDataName": "cloud9InstanceId",
            "envIdDataName": "cloud9EnvironmentId",
            "connectionType": "CONNECT_SSM",
            "instanceTypes": ["m5.large", "m4.large", "t3.large"],
            "imageId": "amazonlinux-2-x86_64",
            "memberArn": "arn:aws:iam::111122223333:user/workshop-admin"
        }))
        .unwrap();
        assert_eq!(config.name, "eks-saas-workshop");
        assert_eq!(config.connection_type, Some(ConnectionType::ConnectSsm));
        assert_eq!(
            config.instance_types,
            ["m5.large", "m4.large", "t3.large"]
        );
        // Unset optionals stay unset rather than defaulting.
        assert_eq!(config.automatic_stop_time_minutes, None);
    }

    #[test]
    fn environment_config_requires_a_name() {
        let result = serde_json::from_value::<Cloud9EnvironmentConfig>(json!({
            "instanceProfileName": "workshop-instance-profile",
            "instanceTagKey": "WORKSHOP",
            "instanceTagValue": "eks-saas",
            "instanceIdDataName": "cloud9InstanceId",
            "envIdDataName": "cloud9EnvironmentId",
            "instanceTypes": ["m5.large"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn connection_type_uses_the_provider_spelling() {
        assert_eq!(ConnectionType::ConnectSsm.to_string(), "CONNECT_SSM");
        assert_eq!(
            "CONNECT_SSH".parse::<ConnectionType>().unwrap(),
            ConnectionType::ConnectSsh
        );
    }

    #[test]
    fn bootstrap_config_requires_every_field() {
        let result = serde_json::from_value::<BootstrapCommandConfig>(json!({
            "clusterName": "eks-saas",
            "region": "us-west-2",
            "instanceId": "i-0123456789abcdef0"
        }));
        assert!(result.is_err());
    }
}
