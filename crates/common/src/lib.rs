//! Shared identifiers used across the fulfillment workspace.

mod types;

pub use types::{CustomerId, OrderNumber, ParseOrderNumberError, RequestKey};
