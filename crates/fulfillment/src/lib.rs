//! Event-driven order fulfillment engine.
//!
//! This crate provides:
//! - The shared [`InventoryLedger`] of prepared units
//! - The [`Command`] abstraction, [`CommandDispatcher`] and [`EventRouter`]
//! - The [`FulfillmentOrchestrator`] splitting demand between stock and the kitchen
//! - One command per handled event type
//! - The [`FulfillmentEngine`] that wires everything to a transport

pub mod command;
pub mod commands;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod kitchen;
pub mod ledger;
pub mod notifications;
pub mod orchestrator;
pub mod router;

pub use command::{Command, CommandContext, ErrorInfo, Handler, TypedResult, handler_fn};
pub use dispatcher::CommandDispatcher;
pub use engine::{EngineConfig, FulfillmentEngine};
pub use error::{ErrorCategory, FulfillmentError, Result};
pub use kitchen::KitchenClient;
pub use ledger::InventoryLedger;
pub use notifications::StatusUpdate;
pub use orchestrator::{Allocation, FulfillmentOrchestrator, FulfillmentOutcome};
pub use router::EventRouter;
