use aws_smithy_types::retry::RetryConfig;
use aws_smithy_types::retry::RetryMode;
use aws_types::region::Region;
use aws_types::SdkConfig;
use log::info;

/// Set up the config for aws calls. The handler's execution-role credentials are picked up
/// from the environment; `region` overrides the environment's region when provided.
pub async fn aws_config(region: &Option<String>) -> SdkConfig {
    let mut config_loader = aws_config::from_env().retry_config(
        RetryConfig::standard()
            .with_retry_mode(RetryMode::Adaptive)
            .with_max_attempts(15),
    );

    if let Some(region) = region {
        info!(
            "Creating a custom region provider for '{}' to be used in the aws config.",
            region
        );
        config_loader = config_loader.region(Region::new(region.clone()));
    }

    config_loader.load().await
}
