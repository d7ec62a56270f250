//! Order aggregate and related types.

mod aggregate;
mod item;
mod status;

pub use aggregate::Order;
pub use item::Item;
pub use status::OrderStatus;

use common::OrderNumber;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The item is not on the menu.
    #[error("Unknown item: {item}")]
    UnknownItem { item: String },

    /// The item is not in the order's requested list.
    #[error("Item not in requested list: {item}")]
    ItemNotRequested { item: String },

    /// A requested line has a zero quantity.
    #[error("Invalid quantity for {item}: {quantity} (must be greater than 0)")]
    InvalidQuantity { item: String, quantity: u32 },

    /// The lines for one item add up to more than a single count can hold.
    #[error("Total quantity for {item} is too large: {total}")]
    QuantityTooLarge { item: String, total: u64 },

    /// The order has no items.
    #[error("Order has no items")]
    EmptyOrder,

    /// The order is not in a status that allows the action.
    #[error("Invalid status transition: cannot {action} from {current_status} status")]
    InvalidStatusTransition {
        current_status: OrderStatus,
        action: &'static str,
    },

    /// No order exists with this number.
    #[error("Order not found: {0}")]
    NotFound(OrderNumber),
}
