//! Executes single commands and captures their outcome.

use std::any::Any;
use std::time::Duration;

use crate::command::{Command, CommandContext, TypedResult};
use crate::error::FulfillmentError;

/// Default bound on downstream calls made by one command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs commands in isolation.
///
/// Every command runs on its own task so that a panic surfaces as a failed
/// [`TypedResult`] instead of unwinding into the caller.
#[derive(Debug, Clone, Copy)]
pub struct CommandDispatcher {
    timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Executes `command` and reports how it went.
    pub async fn dispatch(&self, command: Box<dyn Command>) -> TypedResult {
        let kind = command.kind();
        let ctx = CommandContext::with_timeout(self.timeout);
        let started = std::time::Instant::now();

        let handle = tokio::spawn(async move { command.execute(&ctx).await });
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => Err(FulfillmentError::Panicked(
                panic_message(join_error.into_panic()),
            )),
            Err(join_error) => Err(FulfillmentError::Panicked(join_error.to_string())),
        };

        metrics::histogram!("command_duration_seconds", "command" => kind)
            .record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(()) => {
                metrics::counter!("commands_executed_total", "command" => kind, "outcome" => "success")
                    .increment(1);
                tracing::debug!(command = kind, "command succeeded");
                TypedResult::success(kind)
            }
            Err(error) => {
                metrics::counter!("commands_executed_total", "command" => kind, "outcome" => "failure")
                    .increment(1);
                tracing::warn!(
                    command = kind,
                    category = %error.category(),
                    %error,
                    "command failed"
                );
                TypedResult::failure(kind, &error)
            }
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
