//! Domain error types.

use thiserror::Error;

use crate::order::OrderError;
use crate::repository::RepositoryError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the order store.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl DomainError {
    /// Returns true for errors caused by the request rather than the infrastructure.
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Order(_))
    }
}
