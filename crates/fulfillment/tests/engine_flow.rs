//! End-to-end tests for the fulfillment engine over the in-memory broker.

use std::sync::Arc;
use std::time::Duration;

use common::{CustomerId, OrderNumber};
use domain::{InMemoryOrderRepository, Item, MenuCatalog, OrderStatus};
use fulfillment::{EngineConfig, ErrorCategory, FulfillmentEngine, FulfillmentError};
use messaging::{Envelope, EventType, InMemoryBroker, RetryPolicy, TopicConfig, Transport};
use tokio::sync::oneshot;

fn config() -> EngineConfig {
    EngineConfig {
        retry: RetryPolicy::no_retry(),
        kitchen_time_scale: 0.0,
        ..EngineConfig::default()
    }
}

fn engine(broker: &InMemoryBroker, repository: &InMemoryOrderRepository) -> Arc<FulfillmentEngine> {
    let transport: Arc<dyn Transport> = Arc::new(broker.transport(TopicConfig::default()));
    Arc::new(FulfillmentEngine::new(
        transport,
        Arc::new(repository.clone()),
        Arc::new(MenuCatalog::standard()),
        config(),
    ))
}

/// Feeds every message sent after `cursor` back into the engine until
/// nothing new appears, like a consumer that processes one batch at a time.
async fn pump(engine: &FulfillmentEngine, broker: &InMemoryBroker, cursor: &mut usize) {
    for _ in 0..20 {
        engine.notifier().drain().await;
        let sent = broker.sent().await;
        if sent.len() == *cursor {
            return;
        }
        for delivery in &sent[*cursor..] {
            engine.handle(delivery.envelope.clone()).await;
        }
        *cursor = sent.len();
    }
}

async fn wait_for_status(
    engine: &FulfillmentEngine,
    order_number: OrderNumber,
    status: OrderStatus,
) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let order = engine.orders().require_order(order_number).await.unwrap();
            if order.status() == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "order {order_number} never reached {status}");
}

#[tokio::test]
async fn test_every_event_type_has_a_handler() {
    let broker = InMemoryBroker::new();
    let engine = engine(&broker, &InMemoryOrderRepository::new());
    for event_type in EventType::ALL {
        assert_eq!(engine.router().handler_count(event_type), 1, "{event_type}");
    }
}

#[tokio::test]
async fn test_disabled_kitchen_leaves_requests_to_someone_else() {
    let broker = InMemoryBroker::new();
    let transport: Arc<dyn Transport> = Arc::new(broker.transport(TopicConfig::default()));
    let engine = FulfillmentEngine::new(
        transport,
        Arc::new(InMemoryOrderRepository::new()),
        Arc::new(MenuCatalog::standard()),
        EngineConfig {
            kitchen_enabled: false,
            ..config()
        },
    );
    assert_eq!(engine.router().handler_count(EventType::RequestItem), 0);
}

#[tokio::test]
async fn test_placed_order_is_cooked_packed_and_collected() {
    let broker = InMemoryBroker::new();
    let repository = InMemoryOrderRepository::new();
    let engine = engine(&broker, &repository);

    let order = engine
        .place_order(
            CustomerId::new(3),
            vec![Item::new("hamburger", 2), Item::new("soda", 1)],
        )
        .await
        .unwrap();
    let number = order.order_number();

    let mut cursor = 0;
    pump(&engine, &broker, &mut cursor).await;

    let order = engine.orders().require_order(number).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Ready);
    assert_eq!(order.packed_quantity("hamburger"), 2);
    assert_eq!(engine.ledger().get_current("hamburger"), 0);

    engine.collect_order(number).await.unwrap();
    pump(&engine, &broker, &mut cursor).await;
    assert_eq!(
        engine.orders().require_order(number).await.unwrap().status(),
        OrderStatus::Collected
    );

    let statuses: Vec<String> = broker
        .sent_with_event("order-status-updated")
        .await
        .iter()
        .map(|envelope| String::from_utf8(envelope.payload.clone()).unwrap())
        .collect();
    assert_eq!(
        statuses,
        vec![
            r#"{"status":"IN_PROGRESS"}"#,
            r#"{"status":"READY"}"#,
            r#"{"status":"COLLECTED"}"#,
        ]
    );
}

#[tokio::test]
async fn test_duplicate_collection_is_harmless() {
    let broker = InMemoryBroker::new();
    let repository = InMemoryOrderRepository::new();
    let engine = engine(&broker, &repository);

    let number = engine
        .place_order(CustomerId::new(1), vec![Item::new("water", 1)])
        .await
        .unwrap()
        .order_number();
    pump(&engine, &broker, &mut 0).await;

    let collected = Envelope::builder()
        .event_type(EventType::OrderCollected)
        .order_number(number)
        .build();
    let first = engine.handle(collected.clone()).await;
    let second = engine.handle(collected).await;

    assert!(first.iter().all(|r| r.succeeded));
    assert!(second.iter().all(|r| r.succeeded));
    assert_eq!(
        engine.orders().require_order(number).await.unwrap().status(),
        OrderStatus::Collected
    );
}

#[tokio::test]
async fn test_collecting_an_open_order_is_rejected() {
    let broker = InMemoryBroker::new();
    let engine = engine(&broker, &InMemoryOrderRepository::new());

    let number = engine
        .place_order(CustomerId::new(1), vec![Item::new("fries", 1)])
        .await
        .unwrap()
        .order_number();

    let err = engine.collect_order(number).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::Order(_)));
    assert_eq!(err.category(), ErrorCategory::Validation);
}

#[tokio::test]
async fn test_malformed_and_unknown_messages_fail_without_side_effects() {
    let broker = InMemoryBroker::new();
    let engine = engine(&broker, &InMemoryOrderRepository::new());

    let missing_order = Envelope::builder()
        .event_type(EventType::OrderPlaced)
        .build();
    let results = engine.handle(missing_order).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].command_kind, "fulfill-new-order");
    assert_eq!(results[0].category(), Some(ErrorCategory::Validation));

    let bad_payload = Envelope::builder()
        .event_type(EventType::ItemAddedToStack)
        .payload_raw(b"not json".to_vec())
        .build();
    let results = engine.handle(bad_payload).await;
    assert_eq!(results[0].category(), Some(ErrorCategory::Validation));

    let unknown = Envelope::builder().event_tag("order-refunded").build();
    let results = engine.handle(unknown).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].command_kind, "route");

    assert!(broker.sent().await.is_empty());
}

#[tokio::test]
async fn test_inventory_intake_validates_items() {
    let broker = InMemoryBroker::new();
    let engine = engine(&broker, &InMemoryOrderRepository::new());

    assert_eq!(engine.add_inventory("nuggets", 4).await.unwrap(), 4);
    assert!(matches!(
        engine.add_inventory("soda", 1).await,
        Err(FulfillmentError::UnknownItem(_))
    ));
    assert!(matches!(
        engine.add_inventory("pizza", 1).await,
        Err(FulfillmentError::UnknownItem(_))
    ));
    assert!(matches!(
        engine.add_inventory("nuggets", 0).await,
        Err(FulfillmentError::Order(_))
    ));

    engine.notifier().drain().await;
    assert_eq!(broker.sent_with_event("item-added-to-stack").await.len(), 1);
}

#[tokio::test]
async fn test_run_loop_consumes_until_shutdown() {
    let broker = InMemoryBroker::new();
    let repository = InMemoryOrderRepository::new();
    let engine = engine(&broker, &repository);

    let (stop, stopped) = oneshot::channel::<()>();
    let running = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .run(async {
                    let _ = stopped.await;
                })
                .await
        })
    };
    // Let the loop open its subscription.
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    let number = engine
        .place_order(CustomerId::new(8), vec![Item::new("fries", 3)])
        .await
        .unwrap()
        .order_number();
    wait_for_status(&engine, number, OrderStatus::Ready).await;

    engine.request_sweep().await.unwrap();

    stop.send(()).unwrap();
    running.await.unwrap().unwrap();
    assert_eq!(engine.ledger().get_current("fries"), 0);
}
