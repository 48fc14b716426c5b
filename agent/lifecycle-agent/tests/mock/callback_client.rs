use lifecycle_agent::clients::{CallbackClient, ClientResult};
use lifecycle_agent::provider::ProvisionOutput;
use lifecycle_agent::BootstrapData;
use std::sync::{Arc, Mutex};

/// What the agent reported back, as observed by the test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SentResponse {
    Success(ProvisionOutput),
    Failure {
        physical_resource_id: String,
        reason: String,
    },
}

/// A [`CallbackClient`] that records responses instead of delivering them.
#[derive(Clone, Default)]
pub struct MockCallbackClient {
    pub sent: Arc<Mutex<Vec<SentResponse>>>,
}

#[async_trait::async_trait]
impl CallbackClient for MockCallbackClient {
    fn new(_: &BootstrapData) -> ClientResult<Self> {
        Ok(Self::default())
    }

    async fn send_success(&self, output: &ProvisionOutput) -> ClientResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push(SentResponse::Success(output.clone()));
        Ok(())
    }

    async fn send_failure(&self, physical_resource_id: &str, reason: &str) -> ClientResult<()> {
        self.sent.lock().unwrap().push(SentResponse::Failure {
            physical_resource_id: physical_resource_id.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }
}
