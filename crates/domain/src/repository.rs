//! Order repository contract and in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::OrderNumber;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::order::{Order, OrderStatus};

/// Errors raised by the order store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The store could not be reached.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),
}

/// Predicate for fetching orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Accept only these statuses; `None` accepts every status.
    pub statuses: Option<Vec<OrderStatus>>,
    /// Accept only orders requesting this item.
    pub item_name: Option<String>,
}

impl OrderFilter {
    /// Matches every order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches orders still waiting for units.
    pub fn open() -> Self {
        Self {
            statuses: Some(vec![OrderStatus::Requested, OrderStatus::InProgress]),
            item_name: None,
        }
    }

    /// Narrows the filter to orders requesting `item_name`.
    pub fn requesting(mut self, item_name: impl Into<String>) -> Self {
        self.item_name = Some(item_name.into());
        self
    }

    pub fn matches(&self, order: &Order) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&order.status()) {
                return false;
            }
        }
        if let Some(item_name) = &self.item_name {
            if !order.requests_item(item_name) {
                return false;
            }
        }
        true
    }
}

/// Durable store keyed by order number.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Hands out the next order number; numbers only ever grow.
    async fn next_order_number(&self) -> Result<OrderNumber, RepositoryError>;

    /// Fetches one order.
    async fn get(&self, order_number: OrderNumber) -> Result<Option<Order>, RepositoryError>;

    /// Fetches every order matching `filter`, in ascending order number.
    async fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError>;

    /// Inserts or replaces an order; the last write wins.
    async fn upsert(&self, order: &Order) -> Result<(), RepositoryError>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    orders: BTreeMap<OrderNumber, Order>,
    last_number: i64,
}

/// In-memory order store for tests and single-process runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<InMemoryState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn next_order_number(&self) -> Result<OrderNumber, RepositoryError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        state.last_number += 1;
        Ok(OrderNumber::new(state.last_number))
    }

    async fn get(&self, order_number: OrderNumber) -> Result<Option<Order>, RepositoryError> {
        self.check_available()?;
        Ok(self.state.read().await.orders.get(&order_number).cloned())
    }

    async fn find(&self, filter: &OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect())
    }

    async fn upsert(&self, order: &Order) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut stored = order.clone();
        stored.touch(Utc::now());

        let mut state = self.state.write().await;
        state.last_number = state.last_number.max(order.order_number().as_i64());
        state.orders.insert(order.order_number(), stored);
        Ok(())
    }
}
