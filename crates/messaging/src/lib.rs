//! Message envelopes and the at-least-once transport contract.
//!
//! This crate provides:
//! - The [`Envelope`] shape with its `event` / `order` header conventions
//! - The closed [`EventType`] set used for routing
//! - The [`Transport`] and [`Publisher`] traits, with bounded fixed-delay retry
//! - An in-memory broker for tests and single-process deployments
//! - The subscription loop and a bounded background [`Notifier`]

pub mod envelope;
pub mod error;
pub mod event_type;
pub mod memory;
pub mod notifier;
pub mod retry;
pub mod subscriber;
pub mod transport;

pub use envelope::{EVENT_HEADER, Envelope, EnvelopeBuilder, ItemQuantity, ORDER_HEADER};
pub use error::{MessagingError, Result};
pub use event_type::EventType;
pub use memory::{InMemoryBroker, InMemoryTransport};
pub use notifier::Notifier;
pub use retry::{RetryPolicy, RetryingPublisher, retry_transient};
pub use subscriber::Subscription;
pub use transport::{Delivery, MessageReader, Publisher, TopicConfig, Transport};
