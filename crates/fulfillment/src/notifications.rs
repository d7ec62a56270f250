//! Outbound order notifications.

use domain::{Order, OrderStatus};
use messaging::{Envelope, EventType, Notifier};
use serde::{Deserialize, Serialize};

/// Payload of `order-status-updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Builds the `order-status-updated` envelope for the order's current status.
pub fn status_update_envelope(order: &Order) -> messaging::Result<Envelope> {
    Ok(Envelope::builder()
        .event_type(EventType::OrderStatusUpdated)
        .key(order.order_number().to_string())
        .order_number(order.order_number())
        .payload(&StatusUpdate {
            status: order.status(),
        })?
        .build())
}

/// Hands a status update to the notifier without waiting for delivery.
pub async fn notify_status(notifier: &Notifier, order: &Order) {
    match status_update_envelope(order) {
        Ok(envelope) => notifier.emit(envelope).await,
        Err(error) => {
            metrics::counter!("notifications_failed_total").increment(1);
            tracing::error!(order_number = %order.order_number(), %error, "failed to encode status update");
        }
    }
}
