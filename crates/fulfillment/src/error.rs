//! Fulfillment error types.

use std::time::Duration;

use domain::{DomainError, OrderError, RepositoryError};
use messaging::MessagingError;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while executing fulfillment commands.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The envelope is missing a header or carries an undecodable payload.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The item is not on the menu.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// A take asked for more units than the ledger holds.
    #[error("Insufficient inventory for {item}: requested {requested}, available {available}")]
    InsufficientInventory {
        item: String,
        requested: u32,
        available: u32,
    },

    /// The order store or the transport failed after its own retries.
    #[error("Downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    /// A downstream call did not finish before the command deadline.
    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// The order rejected the operation.
    #[error("Order error: {0}")]
    Order(OrderError),

    /// No handler is registered for the event type.
    #[error("No handler for event type: {0}")]
    NoHandler(String),

    /// The command task panicked or was cancelled.
    #[error("Command panicked: {0}")]
    Panicked(String),
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Caused by the request or message itself; retrying will not help.
    Validation,
    /// Caused by a collaborator; redelivery may succeed.
    Infrastructure,
    /// A broken contract inside the engine.
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Infrastructure => "infrastructure",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FulfillmentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FulfillmentError::MalformedMessage(_)
            | FulfillmentError::UnknownItem(_)
            | FulfillmentError::Order(_)
            | FulfillmentError::NoHandler(_) => ErrorCategory::Validation,
            FulfillmentError::DownstreamUnavailable(_) | FulfillmentError::DeadlineExceeded(_) => {
                ErrorCategory::Infrastructure
            }
            FulfillmentError::InsufficientInventory { .. } | FulfillmentError::Panicked(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

impl From<OrderError> for FulfillmentError {
    fn from(error: OrderError) -> Self {
        match error {
            OrderError::UnknownItem { item } => FulfillmentError::UnknownItem(item),
            other => FulfillmentError::Order(other),
        }
    }
}

impl From<RepositoryError> for FulfillmentError {
    fn from(error: RepositoryError) -> Self {
        FulfillmentError::DownstreamUnavailable(error.to_string())
    }
}

impl From<DomainError> for FulfillmentError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Order(error) => error.into(),
            DomainError::Repository(error) => error.into(),
        }
    }
}

impl From<MessagingError> for FulfillmentError {
    fn from(error: MessagingError) -> Self {
        if error.is_malformed() {
            FulfillmentError::MalformedMessage(error.to_string())
        } else {
            FulfillmentError::DownstreamUnavailable(error.to_string())
        }
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderNumber;

    #[test]
    fn test_validation_and_infrastructure_are_distinguishable() {
        let malformed: FulfillmentError = MessagingError::MissingHeader("order").into();
        assert_eq!(malformed.category(), ErrorCategory::Validation);

        let unknown: FulfillmentError = OrderError::UnknownItem {
            item: "pizza".to_string(),
        }
        .into();
        assert!(matches!(unknown, FulfillmentError::UnknownItem(ref item) if item == "pizza"));
        assert_eq!(unknown.category(), ErrorCategory::Validation);

        let unavailable: FulfillmentError = MessagingError::Unavailable {
            attempts: 5,
            reason: "broker down".to_string(),
        }
        .into();
        assert_eq!(unavailable.category(), ErrorCategory::Infrastructure);

        let store: FulfillmentError =
            DomainError::Repository(RepositoryError::Unavailable("down".to_string())).into();
        assert!(matches!(store, FulfillmentError::DownstreamUnavailable(_)));
    }

    #[test]
    fn test_contract_violations_are_internal() {
        let error = FulfillmentError::InsufficientInventory {
            item: "fries".to_string(),
            requested: 2,
            available: 1,
        };
        assert_eq!(error.category(), ErrorCategory::Internal);
        assert_eq!(
            error.to_string(),
            "Insufficient inventory for fries: requested 2, available 1"
        );
    }

    #[test]
    fn test_order_errors_keep_their_detail() {
        let error: FulfillmentError = OrderError::NotFound(OrderNumber::new(4)).into();
        assert_eq!(error.to_string(), "Order error: Order not found: 4");
        assert_eq!(error.category(), ErrorCategory::Validation);
    }
}
