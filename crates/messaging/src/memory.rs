use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use crate::Envelope;
use crate::error::{MessagingError, Result};
use crate::transport::{Delivery, MessageReader, TopicConfig, Transport};

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
struct BrokerState {
    bus: broadcast::Sender<Delivery>,
    sent: Mutex<Vec<Delivery>>,
    record_history: bool,
    fail_next_sends: AtomicU32,
    unavailable: AtomicBool,
}

/// In-memory broker shared by any number of topic-bound transports.
///
/// Every transport created from the same broker sees every message on the
/// shared bus, so topic filtering behaves as it would against a real
/// cluster where several topics share one consumer connection.
#[derive(Debug, Clone)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
}

impl InMemoryBroker {
    /// Creates a broker with the default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a broker that buffers up to `capacity` undelivered messages per reader.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(capacity, true)
    }

    /// Creates a broker that delivers messages without keeping a record of
    /// them, for long-running single-process deployments.
    pub fn streaming() -> Self {
        Self::build(DEFAULT_CAPACITY, false)
    }

    fn build(capacity: usize, record_history: bool) -> Self {
        let (bus, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Arc::new(BrokerState {
                bus,
                sent: Mutex::new(Vec::new()),
                record_history,
                fail_next_sends: AtomicU32::new(0),
                unavailable: AtomicBool::new(false),
            }),
        }
    }

    /// Returns a transport bound to the configured topic.
    pub fn transport(&self, config: TopicConfig) -> InMemoryTransport {
        InMemoryTransport {
            broker: self.clone(),
            config,
        }
    }

    /// Makes the next `count` send attempts fail with a transient error.
    pub fn fail_next_sends(&self, count: u32) {
        self.state.fail_next_sends.store(count, Ordering::SeqCst);
    }

    /// Makes every send attempt fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns every successfully sent message, in send order.
    ///
    /// Always empty for a [`streaming`](Self::streaming) broker.
    pub async fn sent(&self) -> Vec<Delivery> {
        self.state.sent.lock().await.clone()
    }

    /// Returns the sent envelopes whose `event` header equals `tag`.
    pub async fn sent_with_event(&self, tag: &str) -> Vec<Envelope> {
        self.state
            .sent
            .lock()
            .await
            .iter()
            .filter(|delivery| delivery.envelope.event_tag().ok() == Some(tag))
            .map(|delivery| delivery.envelope.clone())
            .collect()
    }

    /// Clears the record of sent messages.
    pub async fn clear(&self) {
        self.state.sent.lock().await.clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.state.unavailable.load(Ordering::SeqCst) {
            return Err(MessagingError::Transport("broker unavailable".to_string()));
        }

        let injected = self
            .state
            .fail_next_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(MessagingError::Transport("injected send failure".to_string()));
        }

        Ok(())
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// Topic-bound handle on an [`InMemoryBroker`].
#[derive(Debug, Clone)]
pub struct InMemoryTransport {
    broker: InMemoryBroker,
    config: TopicConfig,
}

impl InMemoryTransport {
    /// Creates a transport on a private broker.
    pub fn new(config: TopicConfig) -> Self {
        InMemoryBroker::new().transport(config)
    }

    pub fn broker(&self) -> &InMemoryBroker {
        &self.broker
    }

    pub fn config(&self) -> &TopicConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    fn topic(&self) -> &str {
        &self.config.topic
    }

    async fn send(&self, envelope: Envelope) -> Result<()> {
        self.broker.check_available()?;

        let delivery = Delivery {
            topic: self.config.topic.clone(),
            envelope,
        };

        let state = &self.broker.state;
        let mut sent = state.sent.lock().await;
        if state.record_history {
            sent.push(delivery.clone());
        }
        // No live reader is not an error: the message is simply not consumed.
        let _ = state.bus.send(delivery);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn MessageReader>> {
        Ok(Box::new(InMemoryReader {
            receiver: self.broker.state.bus.subscribe(),
        }))
    }
}

struct InMemoryReader {
    receiver: broadcast::Receiver<Delivery>,
}

#[async_trait]
impl MessageReader for InMemoryReader {
    async fn next_message(&mut self) -> Result<Delivery> {
        match self.receiver.recv().await {
            Ok(delivery) => Ok(delivery),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                Err(MessagingError::Lagged(skipped))
            }
            Err(broadcast::error::RecvError::Closed) => Err(MessagingError::Closed),
        }
    }
}
