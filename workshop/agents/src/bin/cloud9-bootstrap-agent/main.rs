/*!

Custom-resource handler that bootstraps the workshop's Cloud9 instance: it waits for the
instance to pass its status checks, pushes the tool-install script over Run Command, and
blocks until the script has finished.

!*/

mod bootstrap_provider;

use crate::bootstrap_provider::BootstrapProvider;
use agent_utils::aws::aws_config;
use agent_utils::init_agent_logger;
use lifecycle_agent::clients::{CallbackClient, DefaultCallbackClient};
use lifecycle_agent::error::AgentResult;
use lifecycle_agent::{Agent, BootstrapData};
use workshop_agents::clients::{Ec2Instances, SsmCommands};

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
    // The property bag names the region; the clients are built on the ambient one, which is
    // the same in the deployed stack.
    let shared_config = aws_config(&None).await;
    let provider = BootstrapProvider::new(
        Ec2Instances::new(&shared_config),
        SsmCommands::new(&shared_config),
    );
    let callback = DefaultCallbackClient::new(&data)?;
    let agent = Agent::new(data, provider, callback).await?;
    agent.run().await
}
