/*!

One client trait per external API the agents drive, each with an aws-sdk-backed
implementation. The traits exist so providers can be constructed with in-memory fakes in
tests. Lookups report absence as a value, never as an error, so callers branch on "does it
exist" separately from "did the call fail".

!*/

mod command;
mod compute;
mod environment;
mod identity;

pub use command::{CommandClient, CommandDispatch, CommandStatus, SsmCommands};
pub use compute::{attach_profile, ComputeClient, Ec2Instances, ProfileHandle};
pub use environment::{
    Cloud9Environments, CreateEnvironmentRequest, EnvironmentClient, EnvironmentCreation,
    EnvironmentDeletion, EnvironmentStatus,
};
pub use identity::{IamResources, IdentityClient, InstanceProfileRecord};
