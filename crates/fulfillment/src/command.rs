//! Command abstraction, per-execution context and typed results.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use messaging::Envelope;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::{ErrorCategory, FulfillmentError, Result};

/// A unit of work built from one inbound envelope.
///
/// Commands are constructed fresh for every dispatch and own the
/// collaborators they need; nothing about a command is shared between
/// executions.
#[async_trait]
pub trait Command: Send + Sync {
    /// Stable name used in results, logs and metrics.
    fn kind(&self) -> &'static str;

    async fn execute(&self, ctx: &CommandContext) -> Result<()>;
}

/// Bounded context inherited by every downstream call of one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    deadline: Instant,
    timeout: Duration,
}

impl CommandContext {
    /// Creates a context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Runs a downstream call, failing with `DeadlineExceeded` once the
    /// deadline passes.
    pub async fn within<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(FulfillmentError::DeadlineExceeded(self.timeout)),
        }
    }
}

/// Error detail carried by a failed [`TypedResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&FulfillmentError> for ErrorInfo {
    fn from(error: &FulfillmentError) -> Self {
        Self {
            category: error.category(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedResult {
    pub succeeded: bool,
    pub command_kind: String,
    pub error: Option<ErrorInfo>,
}

impl TypedResult {
    pub fn success(command_kind: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            command_kind: command_kind.into(),
            error: None,
        }
    }

    pub fn failure(command_kind: impl Into<String>, error: &FulfillmentError) -> Self {
        Self {
            succeeded: false,
            command_kind: command_kind.into(),
            error: Some(error.into()),
        }
    }

    /// Returns the error category of a failed result.
    pub fn category(&self) -> Option<ErrorCategory> {
        self.error.as_ref().map(|error| error.category)
    }
}

/// Turns an envelope into the command that handles it.
pub trait Handler: Send + Sync {
    /// Kind of the command this handler produces.
    fn kind(&self) -> &'static str;

    /// Parses the envelope and binds the command's parameters.
    fn build(&self, envelope: &Envelope) -> Result<Box<dyn Command>>;
}

/// [`Handler`] backed by a closure.
pub struct FnHandler<F> {
    kind: &'static str,
    build: F,
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Envelope) -> Result<Box<dyn Command>> + Send + Sync,
{
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn build(&self, envelope: &Envelope) -> Result<Box<dyn Command>> {
        (self.build)(envelope)
    }
}

/// Wraps a closure as a shareable handler.
pub fn handler_fn<F>(kind: &'static str, build: F) -> Arc<dyn Handler>
where
    F: Fn(&Envelope) -> Result<Box<dyn Command>> + Send + Sync + 'static,
{
    Arc::new(FnHandler { kind, build })
}
