use agent_utils::json_display;
use lifecycle_agent::provider::{
    FailureKind, IntoProviderError, ProviderError, ProviderResult, ProvisionOutput,
    ProvisionRequest,
};
use lifecycle_agent::ResourceProvider;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::time::Duration;
use workshop_agents::clients::{
    attach_profile, ComputeClient, CreateEnvironmentRequest, EnvironmentClient,
    EnvironmentCreation, EnvironmentDeletion, EnvironmentStatus, IdentityClient, ProfileHandle,
};
use workshop_agents::ensure::ensure_ssm_prerequisites;
use workshop_agents::retry::{wait_until, RetryPolicy};
use workshop_types::Cloud9EnvironmentConfig;

/// Minutes of inactivity before the environment's instance auto-stops, unless the properties
/// say otherwise.
const DEFAULT_AUTOMATIC_STOP_TIME_MINUTES: i32 = 120;

const DEFAULT_DESCRIPTION: &str = "Cloud9 environment for the EKS SaaS workshop";

/// The environment status cadence of the Cloud9 console, with an explicit ceiling.
const STATUS_POLL: RetryPolicy = RetryPolicy::new(Duration::from_secs(30), 20);

/// Drives a Cloud9 environment through creation, readiness, instance-profile attachment and
/// deletion. Updates use the default destroy-then-recreate policy.
pub struct EnvironmentProvider<E, I, C>
where
    E: EnvironmentClient,
    I: IdentityClient,
    C: ComputeClient,
{
    environment: E,
    identity: I,
    compute: C,

    /// The budget for status polls; tests swap in a fast one.
    pub status_poll: RetryPolicy,
}

impl<E, I, C> EnvironmentProvider<E, I, C>
where
    E: EnvironmentClient,
    I: IdentityClient,
    C: ComputeClient,
{
    pub fn new(environment: E, identity: I, compute: C) -> Self {
        Self {
            environment,
            identity,
            compute,
            status_poll: STATUS_POLL,
        }
    }

    /// Try each candidate instance type in priority order. The first accepted candidate wins;
    /// a capacity rejection moves on to the next candidate; exhausting the list is terminal.
    async fn create_with_fallback(
        &self,
        config: &Cloud9EnvironmentConfig,
    ) -> ProviderResult<String> {
        for instance_type in &config.instance_types {
            info!(
                "Attempting to create environment '{}' with instance type '{}'",
                config.name, instance_type
            );
            let request = CreateEnvironmentRequest {
                name: config.name.clone(),
                instance_type: instance_type.clone(),
                description: Some(
                    config
                        .description
                        .clone()
                        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
                ),
                connection_type: config.connection_type,
                image_id: config.image_id.clone(),
                automatic_stop_time_minutes: config
                    .automatic_stop_time_minutes
                    .unwrap_or(DEFAULT_AUTOMATIC_STOP_TIME_MINUTES),
                tag_key: config.instance_tag_key.clone(),
                tag_value: config.instance_tag_value.clone(),
            };
            match self.environment.create_environment(&request).await? {
                EnvironmentCreation::Created(environment_id) => {
                    info!(
                        "Created environment '{}' using instance type '{}'",
                        environment_id, instance_type
                    );
                    return Ok(environment_id);
                }
                EnvironmentCreation::Rejected(message) => {
                    warn!("Instance type '{}' was rejected: {}", instance_type, message);
                }
            }
        }
        Err(ProviderError::new_with_context(
            FailureKind::Provider,
            format!(
                "Unable to create environment '{}': every candidate instance type was rejected",
                config.name
            ),
        ))
    }

    async fn await_ready(&self, environment_id: &str) -> ProviderResult<()> {
        wait_until(&self.status_poll, "the environment to become ready", || {
            let environment = &self.environment;
            async move {
                match environment.environment_status(environment_id).await? {
                    EnvironmentStatus::Ready => Ok(Some(())),
                    status => {
                        debug!("Environment '{}' is {:?}", environment_id, status);
                        Ok(None)
                    }
                }
            }
        })
        .await
    }
}

#[async_trait::async_trait]
impl<E, I, C> ResourceProvider for EnvironmentProvider<E, I, C>
where
    E: EnvironmentClient,
    I: IdentityClient,
    C: ComputeClient,
{
    type Properties = Cloud9EnvironmentConfig;

    async fn create(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        let config = &request.properties;
        debug!(
            "create is starting with the following properties:\n{}",
            json_display(config)
        );
        if config.instance_types.is_empty() {
            return Err(ProviderError::new_with_context(
                FailureKind::Validation,
                "At least one candidate instance type is required",
            ));
        }

        ensure_ssm_prerequisites(&self.identity).await?;

        let environment_id = self.create_with_fallback(config).await?;

        if let Some(member_arn) = &config.member_arn {
            info!("Adding '{}' as a read-write member", member_arn);
            self.environment
                .add_member(&environment_id, member_arn)
                .await?;
        } else {
            info!("memberArn not set, skipping environment membership");
        }

        self.await_ready(&environment_id).await?;

        // Managed credential injection must be off before a custom instance profile can take
        // over the instance's credentials.
        info!(
            "Disabling managed credentials on environment '{}'",
            environment_id
        );
        self.environment
            .disable_managed_credentials(&environment_id)
            .await?;

        let instance_id = self
            .compute
            .find_running_instance(&config.instance_tag_key, &config.instance_tag_value)
            .await?
            .context(
                FailureKind::Provider,
                format!(
                    "No running instance is tagged '{}={}'",
                    config.instance_tag_key, config.instance_tag_value
                ),
            )?;
        info!("Updating instance '{}'", instance_id);

        attach_profile(
            &self.compute,
            &instance_id,
            &ProfileHandle::Name(config.instance_profile_name.clone()),
        )
        .await?;

        info!(
            "Rebooting instance '{}' so the new profile takes effect",
            instance_id
        );
        self.compute.reboot_instance(&instance_id).await?;

        let mut data = BTreeMap::new();
        data.insert(
            "status".to_string(),
            format!("successfully deployed physical_id: {}", environment_id),
        );
        data.insert(config.instance_id_data_name.clone(), instance_id);
        data.insert(config.env_id_data_name.clone(), environment_id.clone());
        Ok(ProvisionOutput {
            physical_resource_id: environment_id,
            data,
        })
    }

    async fn delete(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        let environment_id = request.require_physical_id()?.to_string();
        let mut data = BTreeMap::new();

        match self.environment.delete_environment(&environment_id).await? {
            EnvironmentDeletion::NotFound => {
                info!(
                    "Environment '{}' was not found, treating the deletion as complete",
                    environment_id
                );
                data.insert(
                    "status".to_string(),
                    format!("physical_id: {} not found", environment_id),
                );
                return Ok(ProvisionOutput {
                    physical_resource_id: environment_id,
                    data,
                });
            }
            EnvironmentDeletion::Deleting => {
                info!("Deleting environment '{}'", environment_id);
            }
        }

        wait_until(
            &self.status_poll,
            "the environment deletion to finish",
            || {
                let environment = &self.environment;
                let environment_id = environment_id.as_str();
                async move {
                    match environment.environment_status(environment_id).await? {
                        EnvironmentStatus::Deleting => Ok(None),
                        // Anything else, not-found included, means the deletion is done with.
                        status => {
                            debug!("Environment '{}' is {:?}", environment_id, status);
                            Ok(Some(()))
                        }
                    }
                }
            },
        )
        .await?;

        data.insert(
            "status".to_string(),
            format!("successfully deleted physical_id: {}", environment_id),
        );
        Ok(ProvisionOutput {
            physical_resource_id: environment_id,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use workshop_agents::clients::InstanceProfileRecord;
    use workshop_agents::ensure::{SSM_ACCESS_ROLE_NAME, SSM_INSTANCE_PROFILE_POLICY_ARN};

    const ENVIRONMENT_ID: &str = "env-0123456789abcdef0";
    const INSTANCE_ID: &str = "i-0123456789abcdef0";

    /// One in-memory cloud standing in for Cloud9, IAM and EC2 at once. IAM is pre-linked so
    /// the ensure sequence is a pass-through; its own behavior is covered where it lives.
    #[derive(Clone, Default)]
    struct FakeCloud {
        state: Arc<Mutex<CloudState>>,
    }

    #[derive(Default)]
    struct CloudState {
        rejected_types: Vec<String>,
        create_attempts: Vec<String>,
        members: Vec<String>,
        credentials_disabled: Vec<String>,
        statuses: VecDeque<EnvironmentStatus>,
        delete_results: VecDeque<EnvironmentDeletion>,
        deleted: Vec<String>,
        running_instance: Option<String>,
        association: Option<String>,
        replaced: Vec<(String, String)>,
        associated: Vec<(String, String)>,
        rebooted: Vec<String>,
    }

    #[async_trait::async_trait]
    impl EnvironmentClient for FakeCloud {
        async fn create_environment(
            &self,
            request: &CreateEnvironmentRequest,
        ) -> ProviderResult<EnvironmentCreation> {
            let mut state = self.state.lock().unwrap();
            state.create_attempts.push(request.instance_type.clone());
            if state.rejected_types.contains(&request.instance_type) {
                return Ok(EnvironmentCreation::Rejected(format!(
                    "no capacity for {}",
                    request.instance_type
                )));
            }
            Ok(EnvironmentCreation::Created(ENVIRONMENT_ID.to_string()))
        }

        async fn add_member(&self, _: &str, member_arn: &str) -> ProviderResult<()> {
            self.state
                .lock()
                .unwrap()
                .members
                .push(member_arn.to_string());
            Ok(())
        }

        async fn environment_status(&self, _: &str) -> ProviderResult<EnvironmentStatus> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .statuses
                .pop_front()
                .unwrap_or(EnvironmentStatus::Ready))
        }

        async fn disable_managed_credentials(&self, environment_id: &str) -> ProviderResult<()> {
            self.state
                .lock()
                .unwrap()
                .credentials_disabled
                .push(environment_id.to_string());
            Ok(())
        }

        async fn delete_environment(
            &self,
            environment_id: &str,
        ) -> ProviderResult<EnvironmentDeletion> {
            let mut state = self.state.lock().unwrap();
            state.deleted.push(environment_id.to_string());
            Ok(state
                .delete_results
                .pop_front()
                .unwrap_or(EnvironmentDeletion::NotFound))
        }

        async fn find_environment_by_name(&self, _: &str) -> ProviderResult<Option<String>> {
            Ok(Some(ENVIRONMENT_ID.to_string()))
        }
    }

    #[async_trait::async_trait]
    impl IdentityClient for FakeCloud {
        async fn role_exists(&self, _: &str) -> ProviderResult<bool> {
            Ok(true)
        }

        async fn create_role(&self, _: &str, _: &str, _: &str) -> ProviderResult<()> {
            Ok(())
        }

        async fn attached_policy_arns(&self, _: &str) -> ProviderResult<Vec<String>> {
            Ok(vec![SSM_INSTANCE_PROFILE_POLICY_ARN.to_string()])
        }

        async fn attach_role_policy(&self, _: &str, _: &str) -> ProviderResult<()> {
            Ok(())
        }

        async fn get_instance_profile(
            &self,
            name: &str,
        ) -> ProviderResult<Option<InstanceProfileRecord>> {
            Ok(Some(InstanceProfileRecord {
                arn: format!("arn:aws:iam::000000000000:instance-profile/{}", name),
                role_names: vec![SSM_ACCESS_ROLE_NAME.to_string()],
            }))
        }

        async fn create_instance_profile(&self, _: &str, _: &str) -> ProviderResult<()> {
            Ok(())
        }

        async fn add_role_to_instance_profile(&self, _: &str, _: &str) -> ProviderResult<()> {
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ComputeClient for FakeCloud {
        async fn find_running_instance(
            &self,
            _: &str,
            _: &str,
        ) -> ProviderResult<Option<String>> {
            Ok(self.state.lock().unwrap().running_instance.clone())
        }

        async fn profile_association(&self, _: &str) -> ProviderResult<Option<String>> {
            Ok(self.state.lock().unwrap().association.clone())
        }

        async fn replace_profile_association(
            &self,
            association_id: &str,
            profile: &ProfileHandle,
        ) -> ProviderResult<()> {
            self.state
                .lock()
                .unwrap()
                .replaced
                .push((association_id.to_string(), profile.as_str().to_string()));
            Ok(())
        }

        async fn associate_profile(
            &self,
            instance_id: &str,
            profile: &ProfileHandle,
        ) -> ProviderResult<()> {
            self.state
                .lock()
                .unwrap()
                .associated
                .push((instance_id.to_string(), profile.as_str().to_string()));
            Ok(())
        }

        async fn reboot_instance(&self, instance_id: &str) -> ProviderResult<()> {
            self.state
                .lock()
                .unwrap()
                .rebooted
                .push(instance_id.to_string());
            Ok(())
        }

        async fn instance_status_ok(&self, _: &str) -> ProviderResult<bool> {
            Ok(true)
        }
    }

    fn provider(cloud: &FakeCloud) -> EnvironmentProvider<FakeCloud, FakeCloud, FakeCloud> {
        let mut provider = EnvironmentProvider::new(cloud.clone(), cloud.clone(), cloud.clone());
        provider.status_poll = RetryPolicy::new(Duration::from_millis(1), 5);
        provider
    }

    fn config() -> Cloud9EnvironmentConfig {
        Cloud9EnvironmentConfig {
            name: "eks-saas-workshop".to_string(),
            instance_profile_name: "workshop-instance-profile".to_string(),
            instance_tag_key: "WORKSHOP".to_string(),
            instance_tag_value: "eks-saas".to_string(),
            instance_id_data_name: "cloud9InstanceId".to_string(),
            env_id_data_name: "cloud9EnvironmentId".to_string(),
            instance_types: vec![
                "m5.large".to_string(),
                "m4.large".to_string(),
                "t3.large".to_string(),
            ],
            ..Cloud9EnvironmentConfig::default()
        }
    }

    fn create_request(config: Cloud9EnvironmentConfig) -> ProvisionRequest<Cloud9EnvironmentConfig> {
        ProvisionRequest {
            physical_resource_id: None,
            properties: config,
        }
    }

    fn delete_request() -> ProvisionRequest<Cloud9EnvironmentConfig> {
        ProvisionRequest {
            physical_resource_id: Some(ENVIRONMENT_ID.to_string()),
            properties: config(),
        }
    }

    fn ready_cloud() -> FakeCloud {
        let cloud = FakeCloud::default();
        {
            let mut state = cloud.state.lock().unwrap();
            state.statuses = VecDeque::from(vec![
                EnvironmentStatus::Creating,
                EnvironmentStatus::Ready,
            ]);
            state.running_instance = Some(INSTANCE_ID.to_string());
            state.association = Some("iip-assoc-0001".to_string());
        }
        cloud
    }

    #[tokio::test]
    async fn create_falls_back_through_rejected_candidates() {
        let cloud = ready_cloud();
        cloud.state.lock().unwrap().rejected_types =
            vec!["m5.large".to_string(), "m4.large".to_string()];

        let output = provider(&cloud).create(&create_request(config())).await.unwrap();

        let state = cloud.state.lock().unwrap();
        assert_eq!(
            state.create_attempts.as_slice(),
            ["m5.large", "m4.large", "t3.large"]
        );
        assert_eq!(output.physical_resource_id, ENVIRONMENT_ID);
        assert_eq!(output.data.get("cloud9InstanceId").unwrap(), INSTANCE_ID);
        assert_eq!(
            output.data.get("cloud9EnvironmentId").unwrap(),
            ENVIRONMENT_ID
        );
    }

    #[tokio::test]
    async fn create_stops_at_the_first_accepted_candidate() {
        let cloud = ready_cloud();

        provider(&cloud).create(&create_request(config())).await.unwrap();

        assert_eq!(
            cloud.state.lock().unwrap().create_attempts.as_slice(),
            ["m5.large"]
        );
    }

    #[tokio::test]
    async fn create_fails_when_every_candidate_is_rejected() {
        let cloud = ready_cloud();
        cloud.state.lock().unwrap().rejected_types = vec![
            "m5.large".to_string(),
            "m4.large".to_string(),
            "t3.large".to_string(),
        ];

        let error = provider(&cloud)
            .create(&create_request(config()))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("Unable to create environment"));
    }

    #[tokio::test]
    async fn create_rejects_an_empty_candidate_list_before_any_call() {
        let cloud = ready_cloud();
        let mut config = config();
        config.instance_types.clear();

        let error = provider(&cloud)
            .create(&create_request(config))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), FailureKind::Validation);
        assert!(cloud.state.lock().unwrap().create_attempts.is_empty());
    }

    #[tokio::test]
    async fn membership_is_only_added_when_a_member_arn_is_present() {
        let cloud = ready_cloud();
        provider(&cloud).create(&create_request(config())).await.unwrap();
        assert!(cloud.state.lock().unwrap().members.is_empty());

        let cloud = ready_cloud();
        let mut config = config();
        config.member_arn = Some("arn:aws:iam::111122223333:user/workshop-admin".to_string());
        provider(&cloud).create(&create_request(config)).await.unwrap();
        assert_eq!(
            cloud.state.lock().unwrap().members.as_slice(),
            ["arn:aws:iam::111122223333:user/workshop-admin"]
        );
    }

    #[tokio::test]
    async fn an_existing_association_is_replaced_and_the_instance_rebooted_once() {
        let cloud = ready_cloud();

        provider(&cloud).create(&create_request(config())).await.unwrap();

        let state = cloud.state.lock().unwrap();
        assert_eq!(
            state.replaced.as_slice(),
            [(
                "iip-assoc-0001".to_string(),
                "workshop-instance-profile".to_string()
            )]
        );
        assert!(state.associated.is_empty());
        assert_eq!(state.rebooted.as_slice(), [INSTANCE_ID]);
        assert_eq!(state.credentials_disabled.as_slice(), [ENVIRONMENT_ID]);
    }

    #[tokio::test]
    async fn a_missing_association_is_created_instead() {
        let cloud = ready_cloud();
        cloud.state.lock().unwrap().association = None;

        provider(&cloud).create(&create_request(config())).await.unwrap();

        let state = cloud.state.lock().unwrap();
        assert!(state.replaced.is_empty());
        assert_eq!(
            state.associated.as_slice(),
            [(
                INSTANCE_ID.to_string(),
                "workshop-instance-profile".to_string()
            )]
        );
        assert_eq!(state.rebooted.as_slice(), [INSTANCE_ID]);
    }

    #[tokio::test]
    async fn create_fails_when_no_running_instance_matches_the_tag() {
        let cloud = ready_cloud();
        cloud.state.lock().unwrap().running_instance = None;

        let error = provider(&cloud)
            .create(&create_request(config()))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("No running instance"));
    }

    #[tokio::test]
    async fn create_times_out_when_the_environment_never_becomes_ready() {
        let cloud = ready_cloud();
        cloud.state.lock().unwrap().statuses =
            VecDeque::from(vec![EnvironmentStatus::Creating; 10]);

        let error = provider(&cloud)
            .create(&create_request(config()))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), FailureKind::Timeout);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cloud = FakeCloud::default();
        cloud.state.lock().unwrap().delete_results = VecDeque::from(vec![
            EnvironmentDeletion::Deleting,
            EnvironmentDeletion::NotFound,
        ]);
        cloud.state.lock().unwrap().statuses = VecDeque::from(vec![
            EnvironmentStatus::Deleting,
            EnvironmentStatus::NotFound,
        ]);

        let provider = provider(&cloud);
        let output = provider.delete(&delete_request()).await.unwrap();
        assert_eq!(output.physical_resource_id, ENVIRONMENT_ID);

        // The environment is gone now; deleting again must still succeed.
        let output = provider.delete(&delete_request()).await.unwrap();
        assert_eq!(output.physical_resource_id, ENVIRONMENT_ID);
        assert_eq!(
            cloud.state.lock().unwrap().deleted.as_slice(),
            [ENVIRONMENT_ID, ENVIRONMENT_ID]
        );
    }

    #[tokio::test]
    async fn delete_requires_a_physical_id() {
        let cloud = FakeCloud::default();
        let error = provider(&cloud)
            .delete(&create_request(config()))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), FailureKind::Validation);
    }
}
