/*!

The `lifecycle-agent` library lets you build CloudFormation custom-resource handlers.
You do this by implementing the [`ResourceProvider`] trait, then handing your provider to an
[`Agent`] object, which you package as the binary behind the custom resource's service token.

!*/

mod agent;
mod bootstrap;
pub mod clients;
mod envelope;
pub mod error;
pub mod provider;

pub use agent::{Agent, FALLBACK_PHYSICAL_ID};
pub use bootstrap::{BootstrapData, BootstrapError, ENV_EVENT_PATH};
pub use envelope::{CustomResourceEvent, CustomResourceResponse, RequestType, ResponseStatus};
pub use provider::ResourceProvider;
