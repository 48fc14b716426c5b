mod error;

pub use self::error::{FailureKind, IntoProviderError, ProviderError, ProviderResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// The `Properties` trait marks the "plain old data" structs that model a custom resource's
/// property bag. CloudFormation delivers properties as an untyped JSON object; a `Properties`
/// type gives the provider a strongly typed view of it, and a bag that does not deserialize
/// fails the invocation before the provider runs.
pub trait Properties:
    Serialize + DeserializeOwned + Clone + Debug + Default + Send + Sync + Sized + 'static
{
}

/// A single lifecycle request as seen by a [`ResourceProvider`].
#[derive(Clone, Debug)]
pub struct ProvisionRequest<P>
where
    P: Properties,
{
    /// The physical id returned by the create that this update or delete refers to. `None` on
    /// create.
    pub physical_resource_id: Option<String>,

    /// The typed resource properties.
    pub properties: P,
}

impl<P> ProvisionRequest<P>
where
    P: Properties,
{
    /// The physical id, which update and delete requests must carry.
    pub fn require_physical_id(&self) -> ProviderResult<&str> {
        self.physical_resource_id.as_deref().context(
            FailureKind::Validation,
            "The request carries no physical resource id",
        )
    }
}

/// What a provider reports back when a lifecycle operation succeeds.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProvisionOutput {
    /// The stable identifier correlating this resource's create with its later update and
    /// delete invocations.
    pub physical_resource_id: String,

    /// Name-value pairs the stack can read with `Fn::GetAtt`.
    pub data: BTreeMap<String, String>,
}

/// You implement the [`ResourceProvider`] trait to service the lifecycle requests
/// CloudFormation sends a custom resource. The provider is handed to an [`Agent`] object which
/// drives the handler program.
///
/// Providers hold their own client handles for whatever external APIs they drive; the handles
/// are injected at construction so that tests can substitute fakes.
#[async_trait::async_trait]
pub trait ResourceProvider: Sized + Send + Sync {
    type Properties: Properties;

    /// Create the resource described by `request.properties`, returning its physical id and
    /// output data.
    async fn create(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput>;

    /// Update the resource. The default policy is destroy-then-recreate: mutating a live
    /// environment in place invites partial-update conflicts in the provider's object model,
    /// so the old resource is deleted and the create workflow runs again. This produces a new
    /// physical id even though the logical resource is unchanged; CloudFormation follows up
    /// with a cleanup delete for the old id.
    async fn update(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput> {
        self.delete(request).await?;
        self.create(request).await
    }

    /// Delete the resource. The returned physical id must echo the one in the request so that
    /// CloudFormation can correlate the cleanup with the create that produced the resource.
    /// Deleting a resource that no longer exists is a success, not an error.
    async fn delete(
        &self,
        request: &ProvisionRequest<Self::Properties>,
    ) -> ProviderResult<ProvisionOutput>;
}
