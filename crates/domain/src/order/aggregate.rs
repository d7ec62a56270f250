//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderNumber};
use serde::{Deserialize, Serialize};

use super::{Item, OrderError, OrderStatus};

/// Order aggregate root.
///
/// `requested_items` is the order as placed; `packed_items` is an
/// append-only log of fulfillment increments. The status is derived from
/// the two totals and never assigned directly, except for `Collected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    order_number: OrderNumber,

    customer_id: CustomerId,

    /// Lines as requested, duplicates by name allowed.
    #[serde(rename = "items")]
    requested_items: Vec<Item>,

    /// Fulfillment increments in the order they were applied.
    #[serde(default)]
    packed_items: Vec<Item>,

    status: OrderStatus,

    created_at: DateTime<Utc>,

    modified_at: DateTime<Utc>,
}

// Query methods
impl Order {
    pub fn order_number(&self) -> OrderNumber {
        self.order_number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn requested_items(&self) -> &[Item] {
        &self.requested_items
    }

    pub fn packed_items(&self) -> &[Item] {
        &self.packed_items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Returns true if any requested line names `item_name`.
    pub fn requests_item(&self, item_name: &str) -> bool {
        self.requested_items
            .iter()
            .any(|item| item.name() == item_name)
    }

    /// Sum of requested quantities for one item name.
    pub fn requested_quantity(&self, item_name: &str) -> u64 {
        sum_for(&self.requested_items, item_name)
    }

    /// Sum of packed quantities for one item name.
    pub fn packed_quantity(&self, item_name: &str) -> u64 {
        sum_for(&self.packed_items, item_name)
    }

    /// Sum of every requested quantity.
    pub fn requested_total(&self) -> u64 {
        total(&self.requested_items)
    }

    /// Sum of every packed quantity.
    pub fn packed_total(&self) -> u64 {
        total(&self.packed_items)
    }

    /// Distinct requested item names, in first-requested order.
    pub fn requested_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for item in &self.requested_items {
            if !names.contains(&item.name()) {
                names.push(item.name());
            }
        }
        names
    }

    /// How many units of `item_name` are still owed to the order.
    ///
    /// Negative when the item is over-packed; callers treat anything
    /// at or below zero as nothing missing.
    pub fn missing_count(&self, item_name: &str) -> Result<i64, OrderError> {
        if !self.requests_item(item_name) {
            return Err(OrderError::ItemNotRequested {
                item: item_name.to_string(),
            });
        }

        Ok(self.requested_quantity(item_name) as i64 - self.packed_quantity(item_name) as i64)
    }

    /// Every requested item that still has a positive missing count.
    pub fn missing_items(&self) -> Vec<Item> {
        self.requested_names()
            .into_iter()
            .filter_map(|name| match self.missing_count(name) {
                Ok(count) if count > 0 => {
                    Some(Item::new(name, u32::try_from(count).unwrap_or(u32::MAX)))
                }
                Ok(_) => None,
                Err(error) => {
                    tracing::warn!(order_number = %self.order_number, item = name, %error, "skipping item");
                    None
                }
            })
            .collect()
    }
}

// Mutations
impl Order {
    /// Creates a freshly placed order in `Requested` status.
    pub fn new(order_number: OrderNumber, customer_id: CustomerId, items: Vec<Item>) -> Self {
        let now = Utc::now();
        Self {
            order_number,
            customer_id,
            requested_items: items,
            packed_items: Vec::new(),
            status: OrderStatus::Requested,
            created_at: now,
            modified_at: now,
        }
    }

    /// Records that `quantity` units of `item_name` were packed.
    ///
    /// Returns true iff the derived status differs from the current one, in
    /// which case the new status is assigned.
    pub fn pack_item(&mut self, item_name: &str, quantity: u32) -> bool {
        if quantity > 0 {
            self.packed_items.push(Item::new(item_name, quantity));
        }

        let packed_total = self.packed_total();
        let requested_total = self.requested_total();

        if packed_total == 0 {
            return false;
        }

        let target = if packed_total < requested_total {
            OrderStatus::InProgress
        } else if packed_total == requested_total {
            OrderStatus::Ready
        } else {
            // Over-packed: unreachable for callers that pack at most the
            // missing count. Falls back to the initial status.
            tracing::warn!(
                order_number = %self.order_number,
                packed_total,
                requested_total,
                "packed total exceeds requested total"
            );
            OrderStatus::Requested
        };

        if target == self.status {
            return false;
        }

        self.status = target;
        true
    }

    /// Hands a ready order to the customer.
    ///
    /// Returns true if the status changed; collecting an already collected
    /// order is a no-op so redelivered pickup events are harmless.
    pub fn collect(&mut self) -> Result<bool, OrderError> {
        match self.status {
            OrderStatus::Ready => {
                self.status = OrderStatus::Collected;
                Ok(true)
            }
            OrderStatus::Collected => Ok(false),
            current_status => Err(OrderError::InvalidStatusTransition {
                current_status,
                action: "collect",
            }),
        }
    }

    /// Stamps the modification time; called by the repository on every write.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.modified_at = at;
    }
}

fn sum_for(items: &[Item], item_name: &str) -> u64 {
    items
        .iter()
        .filter(|item| item.name() == item_name)
        .map(|item| u64::from(item.quantity()))
        .sum()
}

fn total(items: &[Item]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity())).sum()
}
