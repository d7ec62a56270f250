//! Outbound kitchen requests.

use std::sync::Arc;

use common::{OrderNumber, RequestKey};
use messaging::{Envelope, EventType, ItemQuantity, Publisher};

use crate::error::Result;

/// Sends `request-item` messages asking the kitchen to prepare units.
#[derive(Clone)]
pub struct KitchenClient {
    publisher: Arc<dyn Publisher>,
}

impl KitchenClient {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    /// Asks for `quantity` units of `item_name` on behalf of an order.
    ///
    /// Each request gets a fresh key; the order number travels as the
    /// correlation header. Acknowledgement is not awaited.
    #[tracing::instrument(skip(self), fields(%order_number, item = item_name))]
    pub async fn request(
        &self,
        order_number: OrderNumber,
        item_name: &str,
        quantity: u32,
    ) -> Result<RequestKey> {
        let request_key = RequestKey::new();
        let envelope = Envelope::builder()
            .event_type(EventType::RequestItem)
            .key(request_key.to_string())
            .order_number(order_number)
            .payload(&vec![ItemQuantity::new(item_name, quantity)])?
            .build();

        self.publisher.publish(envelope).await?;

        metrics::counter!("kitchen_requests_total").increment(1);
        tracing::info!(%request_key, quantity, "kitchen request sent");
        Ok(request_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FulfillmentError;
    use messaging::{InMemoryBroker, RetryPolicy, RetryingPublisher, TopicConfig};

    fn client(broker: &InMemoryBroker) -> KitchenClient {
        let publisher = RetryingPublisher::new(
            broker.transport(TopicConfig::default()),
            RetryPolicy::no_retry(),
        );
        KitchenClient::new(Arc::new(publisher))
    }

    #[tokio::test]
    async fn test_request_carries_key_order_and_payload() {
        let broker = InMemoryBroker::new();
        let key = client(&broker)
            .request(OrderNumber::new(12), "fries", 2)
            .await
            .unwrap();

        let sent = broker.sent_with_event("request-item").await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].key.as_deref(), Some(key.to_string().as_str()));
        assert_eq!(sent[0].order_number().unwrap(), OrderNumber::new(12));
        let payload: Vec<ItemQuantity> = sent[0].decode().unwrap();
        assert_eq!(payload, vec![ItemQuantity::new("fries", 2)]);
    }

    #[tokio::test]
    async fn test_every_request_gets_a_fresh_key() {
        let broker = InMemoryBroker::new();
        let client = client(&broker);
        let a = client.request(OrderNumber::new(1), "fries", 1).await.unwrap();
        let b = client.request(OrderNumber::new(1), "fries", 1).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_send_failure_is_downstream_unavailable() {
        let broker = InMemoryBroker::new();
        broker.set_unavailable(true);

        let err = client(&broker)
            .request(OrderNumber::new(1), "fries", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, FulfillmentError::DownstreamUnavailable(_)));
    }
}
