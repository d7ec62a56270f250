//! Messaging error types.

use common::ParseOrderNumberError;
use thiserror::Error;

/// Errors raised while building, decoding or moving envelopes.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// A required header is absent from the envelope.
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// The `order` header is not a decimal order number.
    #[error("Invalid order header: {0}")]
    InvalidOrderNumber(#[from] ParseOrderNumberError),

    /// The `event` header names a type outside the known set.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// The payload could not be encoded or decoded.
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// A single delivery attempt failed; the broker may recover.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Every retry attempt failed.
    #[error("Transport unavailable after {attempts} attempts: {reason}")]
    Unavailable { attempts: u32, reason: String },

    /// The reader fell behind; the skipped messages cannot be recovered.
    #[error("Subscriber lagged, {0} messages skipped")]
    Lagged(u64),

    /// The underlying channel has been shut down.
    #[error("Transport closed")]
    Closed,
}

impl MessagingError {
    /// Returns true if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, MessagingError::Transport(_))
    }

    /// Returns true if the envelope itself is unusable and must not be retried.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            MessagingError::MissingHeader(_)
                | MessagingError::InvalidOrderNumber(_)
                | MessagingError::UnknownEventType(_)
                | MessagingError::Payload(_)
        )
    }
}

/// Result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;
