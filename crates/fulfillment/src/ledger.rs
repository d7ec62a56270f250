//! Shared per-item inventory counters.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use messaging::{Envelope, EventType, ItemQuantity, Notifier};

use crate::error::{FulfillmentError, Result};

/// Units of prepared items physically on hand.
///
/// Each item has its own atomic counter; the map lock is only taken for
/// writing when a name is seen for the first time. `take` is a single
/// compare-and-swap on the item's counter, so the check and the decrement
/// cannot interleave with another task.
pub struct InventoryLedger {
    counters: RwLock<HashMap<String, Arc<AtomicU32>>>,
    notifier: Option<Notifier>,
}

impl InventoryLedger {
    /// Creates an empty ledger that announces additions through `notifier`.
    pub fn new(notifier: Notifier) -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            notifier: Some(notifier),
        }
    }

    /// Creates an empty ledger that never emits notifications.
    pub fn silent() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            notifier: None,
        }
    }

    /// Adds one unit of `item_name`.
    pub async fn add(&self, item_name: &str) {
        self.add_many(item_name, 1).await;
    }

    /// Adds `quantity` units of `item_name` and announces the arrival.
    ///
    /// Counters cap at `u32::MAX`; units beyond the cap are dropped and
    /// logged. The counter is updated before the notification is handed
    /// off; a failed publish is logged by the notifier and never undoes
    /// the add.
    #[tracing::instrument(skip(self), fields(item = item_name))]
    pub async fn add_many(&self, item_name: &str, quantity: u32) {
        let counter = self.counter(item_name);
        let previous = counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(quantity))
            })
            .unwrap_or_else(|current| current);

        if previous.checked_add(quantity).is_none() {
            let dropped = quantity - (u32::MAX - previous);
            metrics::counter!("ledger_add_saturated_total").increment(1);
            tracing::warn!(previous, added = quantity, dropped, "inventory counter saturated");
        } else {
            tracing::debug!(previous, added = quantity, "inventory added");
        }

        if quantity == 0 {
            return;
        }

        if let Some(notifier) = &self.notifier {
            match arrival_envelope(item_name, quantity) {
                Ok(envelope) => notifier.emit(envelope).await,
                Err(error) => {
                    metrics::counter!("notifications_failed_total").increment(1);
                    tracing::error!(%error, "failed to encode inventory arrival");
                }
            }
        }
    }

    /// Removes exactly `quantity` units of `item_name`.
    ///
    /// Fails without touching the counter when fewer units are on hand.
    pub fn take(&self, item_name: &str, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Ok(());
        }

        let Some(counter) = self.existing(item_name) else {
            return Err(self.rejected(item_name, quantity, 0));
        };

        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(quantity)
            })
            .map(|_| ())
            .map_err(|available| self.rejected(item_name, quantity, available))
    }

    /// Returns the units on hand, zero for names never seen.
    pub fn get_current(&self, item_name: &str) -> u32 {
        self.existing(item_name)
            .map(|counter| counter.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Sets a starting count without announcing it.
    pub fn seed(&self, item_name: &str, quantity: u32) {
        self.counter(item_name).store(quantity, Ordering::Release);
    }

    /// Returns every known counter.
    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, counter)| (name.clone(), counter.load(Ordering::Acquire)))
            .collect()
    }

    fn existing(&self, item_name: &str) -> Option<Arc<AtomicU32>> {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(item_name)
            .cloned()
    }

    fn counter(&self, item_name: &str) -> Arc<AtomicU32> {
        if let Some(counter) = self.existing(item_name) {
            return counter;
        }

        self.counters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(item_name.to_string())
            .or_default()
            .clone()
    }

    fn rejected(&self, item_name: &str, requested: u32, available: u32) -> FulfillmentError {
        metrics::counter!("ledger_take_rejected_total").increment(1);
        tracing::debug!(item = item_name, requested, available, "take rejected");
        FulfillmentError::InsufficientInventory {
            item: item_name.to_string(),
            requested,
            available,
        }
    }
}

impl std::fmt::Debug for InventoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryLedger")
            .field("counters", &self.snapshot())
            .field("notifies", &self.notifier.is_some())
            .finish()
    }
}

fn arrival_envelope(item_name: &str, quantity: u32) -> messaging::Result<Envelope> {
    Ok(Envelope::builder()
        .event_type(EventType::ItemAddedToStack)
        .key(item_name)
        .payload(&vec![ItemQuantity::new(item_name, quantity)])?
        .build())
}
