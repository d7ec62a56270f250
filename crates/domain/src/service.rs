//! Order service providing a simplified API for order placement and lookup.

use std::collections::HashMap;
use std::sync::Arc;

use common::{CustomerId, OrderNumber};

use crate::error::DomainError;
use crate::menu::MenuCatalog;
use crate::order::{Item, Order, OrderError};
use crate::repository::{OrderFilter, OrderRepository};

/// Service for placing and reading orders.
#[derive(Clone)]
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    catalog: Arc<MenuCatalog>,
}

impl OrderService {
    pub fn new(repository: Arc<dyn OrderRepository>, catalog: Arc<MenuCatalog>) -> Self {
        Self {
            repository,
            catalog,
        }
    }

    pub fn repository(&self) -> &Arc<dyn OrderRepository> {
        &self.repository
    }

    pub fn catalog(&self) -> &Arc<MenuCatalog> {
        &self.catalog
    }

    /// Validates the request against the menu and persists a new order.
    #[tracing::instrument(skip(self, items), fields(lines = items.len()))]
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        items: Vec<Item>,
    ) -> Result<Order, DomainError> {
        if items.is_empty() {
            return Err(OrderError::EmptyOrder.into());
        }

        for item in &items {
            self.catalog.entry(item.name())?;
            if item.quantity() == 0 {
                return Err(OrderError::InvalidQuantity {
                    item: item.name().to_string(),
                    quantity: item.quantity(),
                }
                .into());
            }
        }

        let mut totals: HashMap<&str, u64> = HashMap::new();
        for item in &items {
            *totals.entry(item.name()).or_default() += u64::from(item.quantity());
        }
        if let Some((name, total)) = totals
            .into_iter()
            .find(|(_, total)| *total > u64::from(u32::MAX))
        {
            return Err(OrderError::QuantityTooLarge {
                item: name.to_string(),
                total,
            }
            .into());
        }

        let order_number = self.repository.next_order_number().await?;
        let order = Order::new(order_number, customer_id, items);
        self.repository.upsert(&order).await?;

        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(%order_number, %customer_id, "order placed");

        Ok(order)
    }

    /// Loads an order by number.
    pub async fn get_order(&self, order_number: OrderNumber) -> Result<Option<Order>, DomainError> {
        Ok(self.repository.get(order_number).await?)
    }

    /// Loads an order by number, failing if it does not exist.
    pub async fn require_order(&self, order_number: OrderNumber) -> Result<Order, DomainError> {
        self.get_order(order_number)
            .await?
            .ok_or(OrderError::NotFound(order_number).into())
    }

    /// Lists orders matching `filter`, lowest order number first.
    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.find(filter).await?)
    }
}
