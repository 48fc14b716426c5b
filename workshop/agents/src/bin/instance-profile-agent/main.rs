/*!

Custom-resource handler that points an already-running Cloud9 instance at a different IAM
instance profile, resolving the instance through the environment's name and tag.

!*/

mod profile_provider;

use crate::profile_provider::InstanceProfileProvider;
use agent_utils::aws::aws_config;
use agent_utils::init_agent_logger;
use lifecycle_agent::clients::{CallbackClient, DefaultCallbackClient};
use lifecycle_agent::error::AgentResult;
use lifecycle_agent::{Agent, BootstrapData};
use workshop_agents::clients::{Cloud9Environments, Ec2Instances};

#[tokio::main]
async fn main() {
    init_agent_logger(env!("CARGO_CRATE_NAME"), None);
    let data = match BootstrapData::from_env() {
        Ok(ok) => ok,
        Err(e) => {
            eprintln!("Unable to get bootstrap data: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(data).await {
        eprintln!("{}", e);
        std::process::exit(1);
    };
}

async fn run(data: BootstrapData) -> AgentResult<()> {
    let shared_config = aws_config(&None).await;
    let provider = InstanceProfileProvider::new(
        Cloud9Environments::new(&shared_config),
        Ec2Instances::new(&shared_config),
    );
    let callback = DefaultCallbackClient::new(&data)?;
    let agent = Agent::new(data, provider, callback).await?;
    agent.run().await
}
