//! Fire-and-forget publishing with a bounded number of in-flight tasks.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::Envelope;
use crate::transport::Publisher;

/// Publishes notifications on background tasks.
///
/// At most `max_in_flight` publishes run at once; `emit` waits for a slot
/// when the limit is reached. Failures are logged and counted, never
/// returned to the caller.
#[derive(Clone)]
pub struct Notifier {
    publisher: Arc<dyn Publisher>,
    permits: Arc<Semaphore>,
    max_in_flight: u32,
}

impl Notifier {
    pub fn new(publisher: Arc<dyn Publisher>, max_in_flight: u32) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            publisher,
            permits: Arc::new(Semaphore::new(max_in_flight as usize)),
            max_in_flight,
        }
    }

    /// Spawns a task publishing `envelope`.
    pub async fn emit(&self, envelope: Envelope) {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::error!("notifier closed, dropping notification");
                metrics::counter!("notifications_failed_total").increment(1);
                return;
            }
        };

        let publisher = self.publisher.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let event = envelope.event_tag().unwrap_or("-").to_string();
            if let Err(error) = publisher.publish(envelope).await {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::error!(%event, %error, "failed to publish notification");
            }
        });
    }

    /// Waits until every notification emitted so far has finished.
    pub async fn drain(&self) {
        if let Ok(all) = self.permits.acquire_many(self.max_in_flight).await {
            drop(all);
        }
    }

    /// Returns the number of notifications currently being published.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight as usize - self.permits.available_permits()
    }
}
