/*!

Bounded fixed-interval polling for the eventual-consistency transitions the agents wait on.
Every wait has an explicit attempt ceiling; running out of attempts is a `Timeout` failure
rather than a loop that spins until the invocation runtime kills it.

!*/

use lifecycle_agent::provider::{FailureKind, ProviderError, ProviderResult};
use log::debug;
use std::future::Future;
use std::time::Duration;

/// A fixed-interval polling budget.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Sleep-then-poll at the policy's interval until `poll` yields a value. `None` means "not
/// yet"; an error from `poll` propagates immediately. Exhausting the attempt budget fails
/// with `FailureKind::Timeout`, naming `what` was being awaited.
pub async fn wait_until<T, F, Fut>(policy: &RetryPolicy, what: &str, mut poll: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<Option<T>>>,
{
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;
        if let Some(value) = poll().await? {
            return Ok(value);
        }
        debug!(
            "Still waiting for {} (attempt {}/{})",
            what, attempt, policy.max_attempts
        );
    }
    Err(ProviderError::new_with_context(
        FailureKind::Timeout,
        format!(
            "Gave up waiting for {} after {} attempts",
            what, policy.max_attempts
        ),
    ))
}
