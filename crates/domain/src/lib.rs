//! Domain layer for the order fulfillment engine.
//!
//! This crate provides:
//! - The Order aggregate with its packing state machine
//! - The static menu catalog
//! - The order repository contract and an in-memory implementation
//! - The order service used for placement and lookup

pub mod error;
pub mod menu;
pub mod order;
pub mod repository;
pub mod service;

pub use error::DomainError;
pub use menu::{MenuCatalog, MenuEntry};
pub use order::{Item, Order, OrderError, OrderStatus};
pub use repository::{InMemoryOrderRepository, OrderFilter, OrderRepository, RepositoryError};
pub use service::OrderService;
