use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::OrderNumber;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{MessagingError, Result};
use crate::event_type::EventType;

/// Header selecting router dispatch.
pub const EVENT_HEADER: &str = "event";

/// Header carrying the decimal order number on order-scoped envelopes.
pub const ORDER_HEADER: &str = "order";

/// A message as it travels through the transport.
///
/// The engine only interprets the `event` and `order` headers; the payload
/// is opaque bytes until a command decodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Partitioning / idempotency key, if any.
    pub key: Option<String>,

    /// String headers, including `event` and `order`.
    pub headers: BTreeMap<String, String>,

    /// Raw payload bytes (JSON for every event the engine emits).
    pub payload: Vec<u8>,

    /// When the envelope was built.
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Creates a new envelope builder.
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::default()
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Returns the raw `event` tag.
    pub fn event_tag(&self) -> Result<&str> {
        self.header(EVENT_HEADER)
            .ok_or(MessagingError::MissingHeader(EVENT_HEADER))
    }

    /// Resolves the `event` tag against the known event types.
    pub fn event_type(&self) -> Result<EventType> {
        self.event_tag()?.parse()
    }

    /// Parses the `order` header, failing if it is absent or not numeric.
    pub fn order_number(&self) -> Result<OrderNumber> {
        let raw = self
            .header(ORDER_HEADER)
            .ok_or(MessagingError::MissingHeader(ORDER_HEADER))?;
        Ok(raw.parse()?)
    }

    /// Decodes the JSON payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// Builder for constructing envelopes.
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    key: Option<String>,
    headers: BTreeMap<String, String>,
    payload: Vec<u8>,
    timestamp: Option<DateTime<Utc>>,
}

impl EnvelopeBuilder {
    /// Sets the `event` header from a known event type.
    pub fn event_type(self, event_type: EventType) -> Self {
        self.header(EVENT_HEADER, event_type.as_str())
    }

    /// Sets the `event` header to an arbitrary tag.
    pub fn event_tag(self, tag: impl Into<String>) -> Self {
        self.header(EVENT_HEADER, tag)
    }

    /// Sets the `order` header.
    pub fn order_number(self, order_number: OrderNumber) -> Self {
        self.header(ORDER_HEADER, order_number.to_string())
    }

    /// Sets the message key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Adds a header, replacing any previous value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        self.payload = serde_json::to_vec(payload)?;
        Ok(self)
    }

    /// Sets the payload from raw bytes.
    pub fn payload_raw(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Envelope {
        Envelope {
            key: self.key,
            headers: self.headers,
            payload: self.payload,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// One `{itemName, quantity}` line of an inventory-arrival or kitchen-request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuantity {
    pub item_name: String,
    pub quantity: u32,
}

impl ItemQuantity {
    pub fn new(item_name: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_name: item_name.into(),
            quantity,
        }
    }
}
