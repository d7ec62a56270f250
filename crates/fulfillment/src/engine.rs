//! Wires the ledger, orchestrator, commands and router into one engine.

use std::sync::Arc;
use std::time::Duration;

use common::{CustomerId, OrderNumber};
use domain::{Item, MenuCatalog, Order, OrderError, OrderRepository, OrderService, OrderStatus};
use messaging::{
    Envelope, EventType, Notifier, Publisher, RetryPolicy, RetryingPublisher, Transport,
    subscriber,
};

use crate::command::{TypedResult, handler_fn};
use crate::commands::{
    CollectOrder, FulfillNewOrder, KitchenStation, PrepareItems, RecordStatusUpdate,
    RestockOrders, SweepMissingItems,
};
use crate::dispatcher::{CommandDispatcher, DEFAULT_COMMAND_TIMEOUT};
use crate::error::{FulfillmentError, Result};
use crate::kitchen::KitchenClient;
use crate::ledger::InventoryLedger;
use crate::orchestrator::FulfillmentOrchestrator;
use crate::router::EventRouter;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on the downstream calls of one command.
    pub command_timeout: Duration,
    /// Retry policy for every publish.
    pub retry: RetryPolicy,
    /// Whether `request-item` is handled in-process.
    pub kitchen_enabled: bool,
    /// Multiplier applied to preparation durations.
    pub kitchen_time_scale: f64,
    /// Bound on concurrently publishing notifications.
    pub notify_max_in_flight: u32,
    /// Capacity of the inbound message channel.
    pub inbound_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            retry: RetryPolicy::default(),
            kitchen_enabled: true,
            kitchen_time_scale: 1.0,
            notify_max_in_flight: 64,
            inbound_buffer: 256,
        }
    }
}

/// Order fulfillment engine.
///
/// Owns the router with every handler registered, plus the collaborators the
/// outer shell needs for placement and inventory intake.
pub struct FulfillmentEngine {
    router: Arc<EventRouter>,
    orders: OrderService,
    ledger: Arc<InventoryLedger>,
    publisher: Arc<dyn Publisher>,
    notifier: Notifier,
    transport: Arc<dyn Transport>,
    config: EngineConfig,
}

impl FulfillmentEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        repository: Arc<dyn OrderRepository>,
        catalog: Arc<MenuCatalog>,
        config: EngineConfig,
    ) -> Self {
        let publisher: Arc<dyn Publisher> =
            Arc::new(RetryingPublisher::new(transport.clone(), config.retry));
        let notifier = Notifier::new(publisher.clone(), config.notify_max_in_flight);
        let ledger = Arc::new(InventoryLedger::new(notifier.clone()));
        let orchestrator = Arc::new(FulfillmentOrchestrator::new(
            catalog.clone(),
            ledger.clone(),
            repository.clone(),
            KitchenClient::new(publisher.clone()),
            notifier.clone(),
        ));

        let mut router = EventRouter::new(CommandDispatcher::new(config.command_timeout));

        let fulfill = orchestrator.clone();
        router.register(
            &[EventType::OrderPlaced],
            handler_fn(FulfillNewOrder::KIND, move |envelope| {
                FulfillNewOrder::from_envelope(envelope, fulfill.clone())
            }),
        );

        let restock = orchestrator.clone();
        router.register(
            &[EventType::ItemAddedToStack],
            handler_fn(RestockOrders::KIND, move |envelope| {
                RestockOrders::from_envelope(envelope, restock.clone())
            }),
        );

        let sweep = orchestrator;
        router.register(
            &[EventType::CheckMissingItemsOnOrders],
            handler_fn(SweepMissingItems::KIND, move |envelope| {
                SweepMissingItems::from_envelope(envelope, sweep.clone())
            }),
        );

        let collect_repository = repository.clone();
        let collect_notifier = notifier.clone();
        router.register(
            &[EventType::OrderCollected],
            handler_fn(CollectOrder::KIND, move |envelope| {
                CollectOrder::from_envelope(
                    envelope,
                    collect_repository.clone(),
                    collect_notifier.clone(),
                )
            }),
        );

        router.register(
            &[EventType::OrderStatusUpdated],
            handler_fn(RecordStatusUpdate::KIND, RecordStatusUpdate::from_envelope),
        );

        if config.kitchen_enabled {
            let station =
                KitchenStation::new(catalog.clone(), ledger.clone(), config.kitchen_time_scale);
            router.register(
                &[EventType::RequestItem],
                handler_fn(PrepareItems::KIND, move |envelope| {
                    PrepareItems::from_envelope(envelope, station.clone())
                }),
            );
        }

        Self {
            router: Arc::new(router),
            orders: OrderService::new(repository, catalog),
            ledger,
            publisher,
            notifier,
            transport,
            config,
        }
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    pub fn ledger(&self) -> &Arc<InventoryLedger> {
        &self.ledger
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Places an order and announces it with `order-placed`.
    ///
    /// The order is persisted before the announcement; a failed announcement
    /// leaves it `Requested` for the sweep to pick up.
    #[tracing::instrument(skip(self, items), fields(%customer_id))]
    pub async fn place_order(&self, customer_id: CustomerId, items: Vec<Item>) -> Result<Order> {
        let order = self.orders.place_order(customer_id, items).await?;
        let envelope = Envelope::builder()
            .event_type(EventType::OrderPlaced)
            .key(order.order_number().to_string())
            .order_number(order.order_number())
            .build();
        self.publisher.publish(envelope).await?;
        Ok(order)
    }

    /// Requests pickup of a ready order by publishing `order-collected`.
    pub async fn collect_order(&self, order_number: OrderNumber) -> Result<Order> {
        let order = self.orders.require_order(order_number).await?;
        if order.status() != OrderStatus::Ready && order.status() != OrderStatus::Collected {
            return Err(OrderError::InvalidStatusTransition {
                current_status: order.status(),
                action: "collect",
            }
            .into());
        }

        let envelope = Envelope::builder()
            .event_type(EventType::OrderCollected)
            .key(order_number.to_string())
            .order_number(order_number)
            .build();
        self.publisher.publish(envelope).await?;
        Ok(order)
    }

    /// Adds prepared units to stock.
    pub async fn add_inventory(&self, item_name: &str, quantity: u32) -> Result<u32> {
        let catalog = self.orders.catalog();
        if catalog.is_instant_ready(item_name)? {
            return Err(FulfillmentError::UnknownItem(item_name.to_string()));
        }
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                item: item_name.to_string(),
                quantity,
            }
            .into());
        }

        self.ledger.add_many(item_name, quantity).await;
        Ok(self.ledger.get_current(item_name))
    }

    /// Publishes `check-missing-items-on-orders`.
    pub async fn request_sweep(&self) -> Result<()> {
        let envelope = Envelope::builder()
            .event_type(EventType::CheckMissingItemsOnOrders)
            .build();
        self.publisher.publish(envelope).await?;
        Ok(())
    }

    /// Routes one envelope and waits for all of its results.
    pub async fn handle(&self, envelope: Envelope) -> Vec<TypedResult> {
        self.router.route_and_collect(envelope).await
    }

    /// Consumes the transport until `shutdown` resolves or the transport closes.
    ///
    /// Every inbound envelope is routed on its own task. On shutdown the
    /// subscription is stopped and pending notifications are drained.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let subscriber::Subscription {
            mut receiver,
            handle,
        } = subscriber::start(self.transport.clone(), self.config.inbound_buffer).await?;

        tokio::pin!(shutdown);
        tracing::info!(topic = self.transport.topic(), "fulfillment engine running");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping consumption");
                    break;
                }
                inbound = receiver.recv() => {
                    let Some(envelope) = inbound else {
                        tracing::info!("inbound channel closed");
                        break;
                    };
                    self.spawn_route(envelope);
                }
            }
        }

        handle.abort();
        self.notifier.drain().await;
        Ok(())
    }

    fn spawn_route(&self, envelope: Envelope) {
        let event = envelope.event_tag().unwrap_or("-").to_string();
        let mut results = self.router.route(envelope);

        tokio::spawn(async move {
            while let Some(result) = results.recv().await {
                tracing::debug!(
                    %event,
                    command = %result.command_kind,
                    succeeded = result.succeeded,
                    "command finished"
                );
            }
        });
    }
}
