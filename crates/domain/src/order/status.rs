//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Requested ◄──► InProgress ──► Ready ──► Collected
///     │                           ▲
///     └───────────────────────────┘
/// ```
/// Every transition except the last is derived from packed versus
/// requested totals; `Collected` is set explicitly on pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Nothing has been packed yet.
    #[default]
    Requested,

    /// Some, but not all, requested units are packed.
    InProgress,

    /// Every requested unit is packed; waiting for pickup.
    Ready,

    /// The customer picked the order up (terminal state).
    Collected,
}

impl OrderStatus {
    /// Returns true while the order still waits for units.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Requested | OrderStatus::InProgress)
    }

    /// Returns true if the order can be handed to the customer.
    pub fn can_collect(&self) -> bool {
        matches!(self, OrderStatus::Ready)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Collected)
    }

    /// Returns the wire name used in status-update payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Requested => "REQUESTED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Ready => "READY",
            OrderStatus::Collected => "COLLECTED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
