//! Bounded, fixed-delay retry for publishing.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::Envelope;
use crate::error::{MessagingError, Result};
use crate::transport::{Publisher, Transport};

/// How many times a send is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub max_attempts: u32,
    /// Fixed pause between two attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(200),
        }
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy is exhausted.
///
/// Only transient errors are retried. Exhaustion is reported as
/// [`MessagingError::Unavailable`] carrying the last failure.
pub async fn retry_transient<F, Fut, T>(policy: RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "send succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if !error.is_transient() => {
                tracing::error!(%error, "permanent send failure, not retrying");
                return Err(error);
            }
            Err(error) if attempt >= max_attempts => {
                tracing::error!(attempt, %error, "send failed after all retries");
                return Err(MessagingError::Unavailable {
                    attempts: attempt,
                    reason: error.to_string(),
                });
            }
            Err(error) => {
                tracing::warn!(
                    attempt,
                    %error,
                    delay_ms = policy.delay.as_millis() as u64,
                    "transient send failure, retrying after delay"
                );
                metrics::counter!("transport_send_retries_total").increment(1);
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// Publisher that retries transient transport failures.
pub struct RetryingPublisher<T: Transport> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingPublisher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Returns a reference to the wrapped transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<T: Transport> Publisher for RetryingPublisher<T> {
    #[tracing::instrument(skip_all, fields(topic = %self.transport.topic()))]
    async fn publish(&self, envelope: Envelope) -> Result<()> {
        retry_transient(self.policy, |_attempt| {
            let envelope = envelope.clone();
            async move { self.transport.send(envelope).await }
        })
        .await
    }
}
