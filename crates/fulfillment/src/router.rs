//! Event-type based routing of inbound envelopes to commands.

use std::collections::HashMap;
use std::sync::Arc;

use messaging::{Envelope, EventType, MessagingError};
use tokio::sync::mpsc;

use crate::command::{Handler, TypedResult};
use crate::dispatcher::CommandDispatcher;
use crate::error::FulfillmentError;

/// Command kind reported when an envelope cannot be routed at all.
pub const ROUTE_KIND: &str = "route";

/// Maps event types to handlers and fans envelopes out to them.
///
/// The router is built and registered against once at startup, then shared
/// read-only behind an `Arc` while messages flow.
pub struct EventRouter {
    handlers: HashMap<EventType, Vec<Arc<dyn Handler>>>,
    dispatcher: CommandDispatcher,
}

impl EventRouter {
    pub fn new(dispatcher: CommandDispatcher) -> Self {
        Self {
            handlers: HashMap::new(),
            dispatcher,
        }
    }

    /// Registers `handler` for every type in `event_types`.
    ///
    /// Registering the same handler twice for a type has no effect; different
    /// handlers for one type all run.
    pub fn register(&mut self, event_types: &[EventType], handler: Arc<dyn Handler>) {
        for event_type in event_types {
            let registered = self.handlers.entry(*event_type).or_default();
            if registered.iter().any(|existing| Arc::ptr_eq(existing, &handler)) {
                continue;
            }
            tracing::debug!(%event_type, kind = handler.kind(), "handler registered");
            registered.push(handler.clone());
        }
    }

    /// Returns the number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers.get(&event_type).map_or(0, Vec::len)
    }

    pub fn dispatcher(&self) -> CommandDispatcher {
        self.dispatcher
    }

    /// Resolves the envelope's handlers and runs each command on its own task.
    ///
    /// One result arrives per command; the channel closes once every command
    /// has finished. An envelope that cannot be resolved yields a single
    /// failed result instead of an error.
    pub fn route(&self, envelope: Envelope) -> mpsc::Receiver<TypedResult> {
        let handlers = match self.resolve(&envelope) {
            Ok(handlers) => handlers,
            Err(error) => {
                metrics::counter!("router_unknown_event_total").increment(1);
                tracing::warn!(%error, "envelope not routed");
                let (sender, receiver) = mpsc::channel(1);
                let _ = sender.try_send(TypedResult::failure(ROUTE_KIND, &error));
                return receiver;
            }
        };

        let (sender, receiver) = mpsc::channel(handlers.len());
        let envelope = Arc::new(envelope);

        for handler in handlers {
            let sender = sender.clone();
            let envelope = envelope.clone();
            let dispatcher = self.dispatcher;

            tokio::spawn(async move {
                let result = match handler.build(&envelope) {
                    Ok(command) => dispatcher.dispatch(command).await,
                    Err(error) => {
                        metrics::counter!("commands_executed_total", "command" => handler.kind(), "outcome" => "rejected")
                            .increment(1);
                        tracing::warn!(command = handler.kind(), %error, "could not build command");
                        TypedResult::failure(handler.kind(), &error)
                    }
                };
                let _ = sender.send(result).await;
            });
        }

        receiver
    }

    /// Routes the envelope and waits for every result.
    pub async fn route_and_collect(&self, envelope: Envelope) -> Vec<TypedResult> {
        let mut receiver = self.route(envelope);
        let mut results = Vec::new();
        while let Some(result) = receiver.recv().await {
            results.push(result);
        }
        results
    }

    fn resolve(&self, envelope: &Envelope) -> Result<Vec<Arc<dyn Handler>>, FulfillmentError> {
        let event_type = match envelope.event_type() {
            Ok(event_type) => event_type,
            Err(MessagingError::UnknownEventType(tag)) => {
                return Err(FulfillmentError::NoHandler(tag));
            }
            Err(error) => return Err(error.into()),
        };

        match self.handlers.get(&event_type) {
            Some(handlers) if !handlers.is_empty() => Ok(handlers.clone()),
            _ => Err(FulfillmentError::NoHandler(event_type.to_string())),
        }
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(CommandDispatcher::default())
    }
}
