//! Long-lived subscription loop feeding a per-process channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Envelope;
use crate::error::{MessagingError, Result};
use crate::transport::{MessageReader, Transport};

/// Pause after a transient read error before reading again.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Running subscription: the inbound channel plus the task draining the broker.
pub struct Subscription {
    pub receiver: mpsc::Receiver<Envelope>,
    pub handle: JoinHandle<()>,
}

/// Subscribes to the transport's topic and spawns the read loop.
///
/// The reader is opened before this returns, so anything published after
/// `start` completes is observed.
pub async fn start(transport: Arc<dyn Transport>, buffer: usize) -> Result<Subscription> {
    let topic = transport.topic().to_string();
    let reader = transport.subscribe().await?;
    let (sender, receiver) = mpsc::channel(buffer.max(1));

    tracing::info!(%topic, "subscription started");
    let handle = tokio::spawn(read_loop(reader, topic, sender));

    Ok(Subscription { receiver, handle })
}

/// Forwards every message whose topic matches `topic` into `sink`.
///
/// Transient read errors are logged and retried after a short pause. A lag
/// is reported as lost messages and reading resumes at once. The loop ends
/// when the broker closes or when nobody is listening on `sink` any more.
pub async fn read_loop(
    mut reader: Box<dyn MessageReader>,
    topic: String,
    sink: mpsc::Sender<Envelope>,
) {
    loop {
        match reader.next_message().await {
            Ok(delivery) if delivery.topic == topic => {
                if sink.send(delivery.envelope).await.is_err() {
                    tracing::info!(%topic, "inbound channel closed, stopping subscription");
                    break;
                }
            }
            Ok(delivery) => {
                tracing::trace!(%topic, other = %delivery.topic, "skipping message for other topic");
            }
            Err(MessagingError::Closed) => {
                tracing::info!(%topic, "transport closed, stopping subscription");
                break;
            }
            Err(MessagingError::Lagged(skipped)) => {
                metrics::counter!("transport_messages_lost_total").increment(skipped);
                tracing::error!(%topic, skipped, "subscriber fell behind, messages lost");
            }
            Err(error) => {
                metrics::counter!("transport_read_errors_total").increment(1);
                tracing::warn!(%topic, %error, "error reading from transport");
                tokio::time::sleep(READ_ERROR_BACKOFF).await;
            }
        }
    }
}
