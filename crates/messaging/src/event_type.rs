//! The closed set of event tags carried in the `event` header.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MessagingError;

/// Every event type the engine produces or consumes.
///
/// The router is keyed by this enum, so the valid set of tags is known at
/// compile time and an unrecognised tag fails at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// A new order was persisted and needs its first fulfillment pass.
    OrderPlaced,
    /// Units of one or more items were added to the shared stack.
    ItemAddedToStack,
    /// The kitchen is asked to prepare units for an order.
    RequestItem,
    /// The customer picked up a ready order.
    OrderCollected,
    /// Periodic reconciliation of open orders against the stack.
    CheckMissingItemsOnOrders,
    /// An order changed status.
    OrderStatusUpdated,
}

impl EventType {
    /// All known event types, in declaration order.
    pub const ALL: [EventType; 6] = [
        EventType::OrderPlaced,
        EventType::ItemAddedToStack,
        EventType::RequestItem,
        EventType::OrderCollected,
        EventType::CheckMissingItemsOnOrders,
        EventType::OrderStatusUpdated,
    ];

    /// Returns the wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OrderPlaced => "order-placed",
            EventType::ItemAddedToStack => "item-added-to-stack",
            EventType::RequestItem => "request-item",
            EventType::OrderCollected => "order-collected",
            EventType::CheckMissingItemsOnOrders => "check-missing-items-on-orders",
            EventType::OrderStatusUpdated => "order-status-updated",
        }
    }

    /// Returns true if envelopes of this type must carry the `order` header.
    pub fn is_order_scoped(&self) -> bool {
        !matches!(
            self,
            EventType::ItemAddedToStack | EventType::CheckMissingItemsOnOrders
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = MessagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| MessagingError::UnknownEventType(s.to_string()))
    }
}
