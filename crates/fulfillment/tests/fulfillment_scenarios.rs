//! Integration tests for the kitchen fulfillment orchestrator.
//!
//! These tests drive the orchestrator against the in-memory order store and
//! broker and verify ledger, order and outbound message state afterwards.

use std::sync::Arc;
use std::time::Duration;

use common::{CustomerId, OrderNumber};
use domain::{
    InMemoryOrderRepository, Item, MenuCatalog, Order, OrderFilter, OrderRepository, OrderService,
    OrderStatus,
};
use fulfillment::{
    CommandContext, FulfillmentError, FulfillmentOrchestrator, InventoryLedger, KitchenClient,
    StatusUpdate,
};
use messaging::{
    InMemoryBroker, ItemQuantity, Notifier, Publisher, RetryPolicy, RetryingPublisher, TopicConfig,
};

struct Harness {
    broker: InMemoryBroker,
    repository: InMemoryOrderRepository,
    orders: OrderService,
    ledger: Arc<InventoryLedger>,
    notifier: Notifier,
    orchestrator: Arc<FulfillmentOrchestrator>,
}

impl Harness {
    fn new() -> Self {
        let broker = InMemoryBroker::new();
        let publisher: Arc<dyn Publisher> = Arc::new(RetryingPublisher::new(
            broker.transport(TopicConfig::default()),
            RetryPolicy::no_retry(),
        ));
        let notifier = Notifier::new(publisher.clone(), 16);
        let repository = InMemoryOrderRepository::new();
        let catalog = Arc::new(MenuCatalog::standard());
        // Stock is seeded directly; arrival announcements are not under test here.
        let ledger = Arc::new(InventoryLedger::silent());

        let orchestrator = Arc::new(FulfillmentOrchestrator::new(
            catalog.clone(),
            ledger.clone(),
            Arc::new(repository.clone()),
            KitchenClient::new(publisher),
            notifier.clone(),
        ));

        Self {
            broker,
            orders: OrderService::new(Arc::new(repository.clone()), catalog),
            repository,
            ledger,
            notifier,
            orchestrator,
        }
    }

    async fn place(&self, items: &[(&str, u32)]) -> OrderNumber {
        self.orders
            .place_order(
                CustomerId::new(1),
                items.iter().map(|(n, q)| Item::new(*n, *q)).collect(),
            )
            .await
            .unwrap()
            .order_number()
    }

    async fn order(&self, order_number: OrderNumber) -> Order {
        self.orders.require_order(order_number).await.unwrap()
    }

    async fn kitchen_requests(&self) -> Vec<(OrderNumber, ItemQuantity)> {
        let mut requests = Vec::new();
        for envelope in self.broker.sent_with_event("request-item").await {
            let order_number = envelope.order_number().unwrap();
            let payload: Vec<ItemQuantity> = envelope.decode().unwrap();
            for line in payload {
                requests.push((order_number, line));
            }
        }
        requests
    }

    async fn status_updates(&self) -> Vec<(OrderNumber, OrderStatus)> {
        self.notifier.drain().await;
        self.broker
            .sent_with_event("order-status-updated")
            .await
            .iter()
            .map(|envelope| {
                let update: StatusUpdate = envelope.decode().unwrap();
                (envelope.order_number().unwrap(), update.status)
            })
            .collect()
    }
}

fn ctx() -> CommandContext {
    CommandContext::with_timeout(Duration::from_secs(5))
}

mod new_order {
    use super::*;

    #[tokio::test]
    async fn test_enough_stock_packs_everything_without_the_kitchen() {
        let h = Harness::new();
        let number = h.place(&[("hamburger", 2)]).await;
        h.ledger.seed("hamburger", 3);

        let outcome = h
            .orchestrator
            .fulfill_new_order(&ctx(), number)
            .await
            .unwrap();

        assert_eq!(outcome.packed, vec![Item::new("hamburger", 2)]);
        assert!(outcome.kitchen_requests.is_empty());
        assert_eq!(h.ledger.get_current("hamburger"), 1);
        assert!(h.kitchen_requests().await.is_empty());

        let order = h.order(number).await;
        assert_eq!(order.status(), OrderStatus::Ready);
        assert_eq!(h.status_updates().await, vec![(number, OrderStatus::Ready)]);
    }

    #[tokio::test]
    async fn test_partial_stock_packs_what_is_there_and_requests_the_rest() {
        let h = Harness::new();
        let number = h.place(&[("hamburger", 2)]).await;
        h.ledger.seed("hamburger", 1);

        h.orchestrator
            .fulfill_new_order(&ctx(), number)
            .await
            .unwrap();

        assert_eq!(h.ledger.get_current("hamburger"), 0);
        assert_eq!(
            h.kitchen_requests().await,
            vec![(number, ItemQuantity::new("hamburger", 1))]
        );

        let order = h.order(number).await;
        assert_eq!(order.packed_quantity("hamburger"), 1);
        assert_eq!(order.status(), OrderStatus::InProgress);
    }

    #[tokio::test]
    async fn test_empty_stock_requests_every_item_and_packs_nothing() {
        let h = Harness::new();
        let number = h.place(&[("hamburger", 2), ("fries", 1)]).await;

        let outcome = h
            .orchestrator
            .fulfill_new_order(&ctx(), number)
            .await
            .unwrap();

        assert!(outcome.packed.is_empty());
        assert!(!outcome.status_changed);
        assert_eq!(
            h.kitchen_requests().await,
            vec![
                (number, ItemQuantity::new("hamburger", 2)),
                (number, ItemQuantity::new("fries", 1)),
            ]
        );

        let order = h.order(number).await;
        assert!(order.packed_items().is_empty());
        assert_eq!(order.status(), OrderStatus::Requested);
        assert!(h.status_updates().await.is_empty());
    }

    #[tokio::test]
    async fn test_instant_items_are_packed_without_stock() {
        let h = Harness::new();
        let number = h.place(&[("soda", 2), ("water", 1)]).await;

        h.orchestrator
            .fulfill_new_order(&ctx(), number)
            .await
            .unwrap();

        assert!(h.kitchen_requests().await.is_empty());
        assert!(h.ledger.snapshot().is_empty());
        assert_eq!(h.order(number).await.status(), OrderStatus::Ready);
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_fulfilled_as_one_need() {
        let h = Harness::new();
        let number = h.place(&[("fries", 1), ("soda", 1), ("fries", 2)]).await;
        h.ledger.seed("fries", 5);

        h.orchestrator
            .fulfill_new_order(&ctx(), number)
            .await
            .unwrap();

        let order = h.order(number).await;
        assert_eq!(order.packed_quantity("fries"), 3);
        assert_eq!(order.status(), OrderStatus::Ready);
        assert_eq!(h.ledger.get_current("fries"), 2);
    }

    #[tokio::test]
    async fn test_unknown_order_is_an_order_error() {
        let h = Harness::new();
        let err = h
            .orchestrator
            .fulfill_new_order(&ctx(), OrderNumber::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::Order(_)));
    }
}

mod restock {
    use super::*;

    async fn two_waiting_orders(h: &Harness) -> (OrderNumber, OrderNumber) {
        let first = h.place(&[("spicy-stripes", 3), ("soda", 1)]).await;
        let second = h.place(&[("spicy-stripes", 2), ("water", 1)]).await;
        h.orchestrator.fulfill_new_order(&ctx(), first).await.unwrap();
        h.orchestrator
            .fulfill_new_order(&ctx(), second)
            .await
            .unwrap();
        assert_eq!(h.order(first).await.status(), OrderStatus::InProgress);
        assert_eq!(h.order(second).await.status(), OrderStatus::InProgress);
        h.broker.clear().await;
        (first, second)
    }

    #[tokio::test]
    async fn test_lower_order_number_is_served_first() {
        let h = Harness::new();
        let (first, second) = two_waiting_orders(&h).await;

        h.ledger.seed("spicy-stripes", 3);
        let outcomes = h
            .orchestrator
            .restock(&ctx(), "spicy-stripes")
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].order_number, first);
        assert_eq!(h.order(first).await.status(), OrderStatus::Ready);
        assert_eq!(h.order(second).await.packed_quantity("spicy-stripes"), 0);
        assert_eq!(h.ledger.get_current("spicy-stripes"), 0);
        assert!(h.kitchen_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_leftover_units_flow_to_the_next_order() {
        let h = Harness::new();
        let (first, second) = two_waiting_orders(&h).await;

        h.ledger.seed("spicy-stripes", 4);
        h.orchestrator
            .restock(&ctx(), "spicy-stripes")
            .await
            .unwrap();

        assert_eq!(h.order(first).await.status(), OrderStatus::Ready);
        let second_order = h.order(second).await;
        assert_eq!(second_order.packed_quantity("spicy-stripes"), 1);
        assert_eq!(second_order.status(), OrderStatus::InProgress);
        assert_eq!(
            h.kitchen_requests().await,
            vec![(second, ItemQuantity::new("spicy-stripes", 1))]
        );
    }

    #[tokio::test]
    async fn test_redelivered_arrival_does_not_pack_twice() {
        let h = Harness::new();
        let (first, second) = two_waiting_orders(&h).await;

        h.ledger.seed("spicy-stripes", 3);
        h.orchestrator
            .restock(&ctx(), "spicy-stripes")
            .await
            .unwrap();
        let after_first = h.order(first).await;

        let outcomes = h
            .orchestrator
            .restock(&ctx(), "spicy-stripes")
            .await
            .unwrap();

        assert!(outcomes.is_empty());
        assert_eq!(h.order(first).await.packed_items(), after_first.packed_items());
        assert_eq!(h.order(second).await.packed_quantity("spicy-stripes"), 0);
        assert!(h.kitchen_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_ready_and_unrelated_orders_are_ignored() {
        let h = Harness::new();
        let unrelated = h.place(&[("nuggets", 1)]).await;
        let ready = h.place(&[("fries", 1)]).await;
        h.ledger.seed("fries", 1);
        h.orchestrator.fulfill_new_order(&ctx(), ready).await.unwrap();

        h.ledger.seed("fries", 2);
        let outcomes = h.orchestrator.restock(&ctx(), "fries").await.unwrap();

        assert!(outcomes.is_empty());
        assert_eq!(h.ledger.get_current("fries"), 2);
        assert!(h.order(unrelated).await.packed_items().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_arrival_is_rejected() {
        let h = Harness::new();
        let err = h.orchestrator.restock(&ctx(), "pizza").await.unwrap_err();
        assert!(matches!(err, FulfillmentError::UnknownItem(_)));
    }
}

mod sweep {
    use super::*;

    #[tokio::test]
    async fn test_sweep_recovers_orders_from_persisted_state() {
        let h = Harness::new();
        // Placed but never announced: nothing has looked at these orders yet.
        let first = h.place(&[("nuggets", 2), ("orange-juice", 1)]).await;
        let second = h.place(&[("nuggets", 1)]).await;
        h.ledger.seed("nuggets", 2);

        let outcomes = h.orchestrator.sweep(&ctx()).await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(h.order(first).await.status(), OrderStatus::Ready);
        assert!(h.order(second).await.packed_items().is_empty());
        assert_eq!(
            h.kitchen_requests().await,
            vec![(second, ItemQuantity::new("nuggets", 1))]
        );
    }

    #[tokio::test]
    async fn test_sweep_skips_complete_orders() {
        let h = Harness::new();
        let number = h.place(&[("soda", 1)]).await;
        h.orchestrator.fulfill_new_order(&ctx(), number).await.unwrap();

        let outcomes = h.orchestrator.sweep(&ctx()).await.unwrap();
        assert!(outcomes.is_empty());
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_kitchen_failure_keeps_the_take_and_the_pack() {
        let h = Harness::new();
        let number = h.place(&[("cheeseburger", 3)]).await;
        h.ledger.seed("cheeseburger", 1);
        h.broker.set_unavailable(true);

        let err = h
            .orchestrator
            .fulfill_new_order(&ctx(), number)
            .await
            .unwrap_err();

        assert!(matches!(err, FulfillmentError::DownstreamUnavailable(_)));
        assert_eq!(h.ledger.get_current("cheeseburger"), 0);
        let order = h.order(number).await;
        assert_eq!(order.packed_quantity("cheeseburger"), 1);
        assert_eq!(order.status(), OrderStatus::InProgress);
    }

    #[tokio::test]
    async fn test_store_outage_is_downstream_unavailable() {
        let h = Harness::new();
        let number = h.place(&[("fries", 1)]).await;
        h.repository.set_unavailable(true);

        let err = h
            .orchestrator
            .fulfill_new_order(&ctx(), number)
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::DownstreamUnavailable(_)));
    }
}

mod races {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_new_orders_share_stock_without_overdraw() {
        let h = Harness::new();
        let mut numbers = Vec::new();
        for _ in 0..10 {
            numbers.push(h.place(&[("nuggets", 1)]).await);
        }
        h.ledger.seed("nuggets", 5);

        let mut handles = Vec::new();
        for number in numbers.clone() {
            let orchestrator = h.orchestrator.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.fulfill_new_order(&ctx(), number).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let ready = h
            .orders
            .list_orders(&OrderFilter::all())
            .await
            .unwrap()
            .into_iter()
            .filter(|order| order.status() == OrderStatus::Ready)
            .count();
        assert_eq!(ready, 5);
        assert_eq!(h.ledger.get_current("nuggets"), 0);
        assert_eq!(h.kitchen_requests().await.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_restocks_never_hand_out_more_than_arrived() {
        let h = Harness::new();
        let mut numbers = Vec::new();
        for _ in 0..6 {
            let number = h.place(&[("fries", 1)]).await;
            h.orchestrator.fulfill_new_order(&ctx(), number).await.unwrap();
            numbers.push(number);
        }
        h.ledger.seed("fries", 4);

        let a = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.restock(&ctx(), "fries").await })
        };
        let b = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.restock(&ctx(), "fries").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let mut packed = 0;
        for number in numbers {
            let order = h.repository.get(number).await.unwrap().unwrap();
            assert!(order.packed_quantity("fries") <= order.requested_quantity("fries"));
            packed += order.packed_quantity("fries");
        }
        assert!(packed <= 4);
        assert_eq!(h.ledger.get_current("fries"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_restock_racing_new_order_pass_never_overpacks() {
        for _ in 0..25 {
            let h = Harness::new();
            let number = h.place(&[("fries", 3)]).await;
            h.ledger.seed("fries", 5);

            let placed = {
                let orchestrator = h.orchestrator.clone();
                tokio::spawn(async move { orchestrator.fulfill_new_order(&ctx(), number).await })
            };
            let arrived = {
                let orchestrator = h.orchestrator.clone();
                tokio::spawn(async move { orchestrator.restock(&ctx(), "fries").await })
            };
            placed.await.unwrap().unwrap();
            arrived.await.unwrap().unwrap();

            let order = h.order(number).await;
            let packed = order.packed_quantity("fries");
            let remaining = h.ledger.get_current("fries");
            assert!((1..=3).contains(&packed));
            assert!(remaining <= 2);
            assert!(u64::from(remaining) + packed <= 5);
            let expected = if packed == 3 {
                OrderStatus::Ready
            } else {
                OrderStatus::InProgress
            };
            assert_eq!(order.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_redelivered_placement_of_a_covered_order_requests_nothing() {
        let h = Harness::new();
        let number = h.place(&[("fries", 2)]).await;
        h.ledger.seed("fries", 2);

        h.orchestrator.fulfill_new_order(&ctx(), number).await.unwrap();
        assert_eq!(h.order(number).await.status(), OrderStatus::Ready);
        h.broker.clear().await;

        let outcome = h
            .orchestrator
            .fulfill_new_order(&ctx(), number)
            .await
            .unwrap();

        assert!(outcome.packed.is_empty());
        assert!(outcome.kitchen_requests.is_empty());
        assert!(!outcome.status_changed);
        assert!(h.kitchen_requests().await.is_empty());
        assert_eq!(h.order(number).await.packed_quantity("fries"), 2);
    }

    #[tokio::test]
    async fn test_redelivered_placement_requests_only_what_is_still_missing() {
        let h = Harness::new();
        let number = h.place(&[("fries", 3)]).await;
        h.ledger.seed("fries", 1);

        h.orchestrator.fulfill_new_order(&ctx(), number).await.unwrap();
        assert_eq!(
            h.kitchen_requests().await,
            vec![(number, ItemQuantity::new("fries", 2))]
        );
        h.broker.clear().await;

        h.ledger.seed("fries", 1);
        let outcome = h
            .orchestrator
            .fulfill_new_order(&ctx(), number)
            .await
            .unwrap();

        assert_eq!(outcome.packed, vec![Item::new("fries", 1)]);
        assert_eq!(
            h.kitchen_requests().await,
            vec![(number, ItemQuantity::new("fries", 1))]
        );
        let order = h.order(number).await;
        assert_eq!(order.packed_quantity("fries"), 2);
        assert_eq!(order.status(), OrderStatus::InProgress);
    }
}
