//! Splits each order's needs between the inventory ledger and the kitchen.

use std::sync::Arc;

use common::OrderNumber;
use domain::{Item, MenuCatalog, Order, OrderError, OrderFilter, OrderRepository, OrderStatus};
use messaging::Notifier;

use crate::command::CommandContext;
use crate::error::{FulfillmentError, Result};
use crate::kitchen::KitchenClient;
use crate::ledger::InventoryLedger;
use crate::notifications::notify_status;

/// How often a take is retried after another task drained the counter
/// between the read and the take.
const MAX_TAKE_ATTEMPTS: u32 = 8;

/// Split of one item's need between stock and the kitchen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Units removed from the ledger (or handed out directly for instant items).
    pub taken: u32,
    /// Units that must be requested from the kitchen.
    pub shortfall: u32,
}

impl Allocation {
    fn full(needed: u32) -> Self {
        Self {
            taken: needed,
            shortfall: 0,
        }
    }

    fn none(needed: u32) -> Self {
        Self {
            taken: 0,
            shortfall: needed,
        }
    }
}

/// What one pass over one order did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentOutcome {
    pub order_number: OrderNumber,
    pub packed: Vec<Item>,
    pub kitchen_requests: Vec<Item>,
    pub status: OrderStatus,
    pub status_changed: bool,
}

impl FulfillmentOutcome {
    fn untouched(order: &Order) -> Self {
        Self {
            order_number: order.order_number(),
            packed: Vec::new(),
            kitchen_requests: Vec::new(),
            status: order.status(),
            status_changed: false,
        }
    }
}

/// Kitchen fulfillment orchestrator.
///
/// Every flow follows the same per-item steps: instant items are packed
/// outright; stocked items take `min(available, needed)` from the ledger
/// and the rest is requested from the kitchen. The order is persisted once
/// after packing, the status change is announced, then kitchen requests go
/// out. Nothing is rolled back when a later step fails.
pub struct FulfillmentOrchestrator {
    catalog: Arc<MenuCatalog>,
    ledger: Arc<InventoryLedger>,
    repository: Arc<dyn OrderRepository>,
    kitchen: KitchenClient,
    notifier: Notifier,
}

impl FulfillmentOrchestrator {
    pub fn new(
        catalog: Arc<MenuCatalog>,
        ledger: Arc<InventoryLedger>,
        repository: Arc<dyn OrderRepository>,
        kitchen: KitchenClient,
        notifier: Notifier,
    ) -> Self {
        Self {
            catalog,
            ledger,
            repository,
            kitchen,
            notifier,
        }
    }

    pub fn catalog(&self) -> &Arc<MenuCatalog> {
        &self.catalog
    }

    pub fn ledger(&self) -> &Arc<InventoryLedger> {
        &self.ledger
    }

    pub fn repository(&self) -> &Arc<dyn OrderRepository> {
        &self.repository
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Takes as much of `needed` as the ledger holds.
    ///
    /// A take that loses a race against another task re-reads the counter
    /// and tries again with the new amount.
    pub fn allocate(&self, item_name: &str, needed: u32) -> Result<Allocation> {
        for attempt in 1..=MAX_TAKE_ATTEMPTS {
            let available = self.ledger.get_current(item_name);
            let take = available.min(needed);
            if take == 0 {
                return Ok(Allocation::none(needed));
            }

            match self.ledger.take(item_name, take) {
                Ok(()) => {
                    return Ok(Allocation {
                        taken: take,
                        shortfall: needed - take,
                    });
                }
                Err(FulfillmentError::InsufficientInventory { available, .. }) => {
                    tracing::debug!(item = item_name, attempt, available, "lost take race");
                }
                Err(error) => return Err(error),
            }
        }

        tracing::warn!(item = item_name, needed, "ledger kept changing, deferring to kitchen");
        Ok(Allocation::none(needed))
    }

    /// New-order flow: covers every requested item of a freshly placed order.
    #[tracing::instrument(skip(self, ctx), fields(%order_number))]
    pub async fn fulfill_new_order(
        &self,
        ctx: &CommandContext,
        order_number: OrderNumber,
    ) -> Result<FulfillmentOutcome> {
        let order = self.load(ctx, order_number).await?;
        if !order.status().is_open() {
            tracing::debug!(status = %order.status(), "order no longer open, nothing to do");
            return Ok(FulfillmentOutcome::untouched(&order));
        }

        let item_names: Vec<String> = order
            .requested_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        self.fulfill(ctx, order, &item_names).await
    }

    /// Restock flow: hands newly arrived units of `item_name` to open orders,
    /// lowest order number first, until the ledger runs dry.
    #[tracing::instrument(skip(self, ctx), fields(item = item_name))]
    pub async fn restock(
        &self,
        ctx: &CommandContext,
        item_name: &str,
    ) -> Result<Vec<FulfillmentOutcome>> {
        if self.catalog.is_instant_ready(item_name)? {
            tracing::debug!("instant-ready item is not stocked");
            return Ok(Vec::new());
        }

        let filter = OrderFilter::open().requesting(item_name);
        let candidates = ctx
            .within(async {
                self.repository
                    .find(&filter)
                    .await
                    .map_err(FulfillmentError::from)
            })
            .await?;

        let item_names = [item_name.to_string()];
        let mut outcomes = Vec::new();

        for candidate in candidates {
            if self.ledger.get_current(item_name) == 0 {
                tracing::debug!("arrived units exhausted");
                break;
            }

            // Re-read so a concurrent pass over the same order is seen.
            let order = self.load(ctx, candidate.order_number()).await?;
            if !order.status().is_open() || order.missing_count(item_name)? <= 0 {
                continue;
            }

            outcomes.push(self.fulfill(ctx, order, &item_names).await?);
        }

        Ok(outcomes)
    }

    /// Reconciliation flow: re-derives what every open order still misses.
    ///
    /// A failure on one order does not stop the sweep; the last error is
    /// returned after every order has been visited.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn sweep(&self, ctx: &CommandContext) -> Result<Vec<FulfillmentOutcome>> {
        let filter = OrderFilter::open();
        let open_orders = ctx
            .within(async {
                self.repository
                    .find(&filter)
                    .await
                    .map_err(FulfillmentError::from)
            })
            .await?;

        let mut outcomes = Vec::new();
        let mut last_error = None;

        for order in open_orders {
            let item_names: Vec<String> = order
                .missing_items()
                .into_iter()
                .map(|item| item.name().to_string())
                .collect();
            if item_names.is_empty() {
                continue;
            }

            let order_number = order.order_number();
            match self.fulfill(ctx, order, &item_names).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => {
                    tracing::warn!(%order_number, %error, "sweep could not complete order");
                    last_error = Some(error);
                }
            }
        }

        tracing::info!(orders = outcomes.len(), "sweep finished");
        match last_error {
            Some(error) => Err(error),
            None => Ok(outcomes),
        }
    }

    async fn load(&self, ctx: &CommandContext, order_number: OrderNumber) -> Result<Order> {
        ctx.within(async {
            self.repository
                .get(order_number)
                .await
                .map_err(FulfillmentError::from)
        })
        .await?
        .ok_or(FulfillmentError::Order(OrderError::NotFound(order_number)))
    }

    async fn fulfill(
        &self,
        ctx: &CommandContext,
        mut order: Order,
        item_names: &[String],
    ) -> Result<FulfillmentOutcome> {
        let order_number = order.order_number();
        let previous_status = order.status();
        let mut packed = Vec::new();
        let mut kitchen_requests = Vec::new();

        for item_name in item_names {
            let missing = order.missing_count(item_name)?;
            if missing <= 0 {
                continue;
            }
            let needed = u32::try_from(missing).unwrap_or(u32::MAX);

            let allocation = if self.catalog.is_instant_ready(item_name)? {
                Allocation::full(needed)
            } else {
                self.allocate(item_name, needed)?
            };

            if allocation.taken > 0 {
                order.pack_item(item_name, allocation.taken);
                packed.push(Item::new(item_name.as_str(), allocation.taken));
            }
            if allocation.shortfall > 0 {
                kitchen_requests.push(Item::new(item_name.as_str(), allocation.shortfall));
            }
        }

        if !packed.is_empty() {
            ctx.within(async {
                self.repository
                    .upsert(&order)
                    .await
                    .map_err(FulfillmentError::from)
            })
            .await?;
        }

        let status_changed = order.status() != previous_status;
        if status_changed {
            notify_status(&self.notifier, &order).await;
        }

        for request in &kitchen_requests {
            ctx.within(
                self.kitchen
                    .request(order_number, request.name(), request.quantity()),
            )
            .await?;
        }

        tracing::info!(
            %order_number,
            packed = packed.len(),
            requested = kitchen_requests.len(),
            status = %order.status(),
            "order fulfillment pass complete"
        );

        Ok(FulfillmentOutcome {
            order_number,
            packed,
            kitchen_requests,
            status: order.status(),
            status_changed,
        })
    }
}
