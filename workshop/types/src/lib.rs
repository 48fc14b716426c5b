/*!

`workshop-types` holds the typed property bags consumed by the workshop's custom-resource
agents. The field spellings match the camelCase property bags assembled by the CDK stacks that
own the custom resources.

!*/

mod agent_config;

pub use agent_config::{
    BootstrapCommandConfig, Cloud9EnvironmentConfig, ConnectionType, InstanceProfileConfig,
};
