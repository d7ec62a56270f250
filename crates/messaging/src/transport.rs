//! Transport contract consumed by the engine.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Envelope;
use crate::error::Result;

/// Topic settings handed to a transport constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub partitions: i32,
    pub replication_factor: i16,
}

impl TopicConfig {
    /// Returns the broker list as a comma separated bootstrap string.
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: "orders".to_string(),
            partitions: 1,
            replication_factor: 1,
        }
    }
}

/// A message read from the broker together with the topic it was read from.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub topic: String,
    pub envelope: Envelope,
}

/// An at-least-once message transport bound to one topic.
///
/// `send` is a single delivery attempt; retrying is layered on top by
/// [`RetryingPublisher`](crate::RetryingPublisher).
#[async_trait]
pub trait Transport: Send + Sync {
    /// The topic this transport publishes to and consumes from.
    fn topic(&self) -> &str;

    /// Makes one attempt to deliver the envelope.
    async fn send(&self, envelope: Envelope) -> Result<()>;

    /// Opens a reader positioned after the most recent message.
    async fn subscribe(&self) -> Result<Box<dyn MessageReader>>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn topic(&self) -> &str {
        (**self).topic()
    }

    async fn send(&self, envelope: Envelope) -> Result<()> {
        (**self).send(envelope).await
    }

    async fn subscribe(&self) -> Result<Box<dyn MessageReader>> {
        (**self).subscribe().await
    }
}

/// Blocking reader over a subscription.
#[async_trait]
pub trait MessageReader: Send {
    /// Waits for the next message.
    async fn next_message(&mut self) -> Result<Delivery>;
}

/// Publishing side used by the engine's commands.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, envelope: Envelope) -> Result<()>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn publish(&self, envelope: Envelope) -> Result<()> {
        (**self).publish(envelope).await
    }
}
