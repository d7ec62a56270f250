use std::sync::Arc;

use async_trait::async_trait;
use messaging::{Envelope, ItemQuantity};

use crate::command::{Command, CommandContext};
use crate::error::{FulfillmentError, Result};
use crate::orchestrator::FulfillmentOrchestrator;

/// Handles `item-added-to-stack`: offers the arrived items to open orders.
///
/// The payload only says which items to look at. How much each order gets
/// is re-derived from its missing count and the ledger, so a redelivered
/// arrival never packs twice.
pub struct RestockOrders {
    arrivals: Vec<ItemQuantity>,
    orchestrator: Arc<FulfillmentOrchestrator>,
}

impl RestockOrders {
    pub const KIND: &'static str = "restock-orders";

    pub fn new(arrivals: Vec<ItemQuantity>, orchestrator: Arc<FulfillmentOrchestrator>) -> Self {
        Self {
            arrivals,
            orchestrator,
        }
    }

    pub fn from_envelope(
        envelope: &Envelope,
        orchestrator: Arc<FulfillmentOrchestrator>,
    ) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self::new(envelope.decode()?, orchestrator)))
    }
}

#[async_trait]
impl Command for RestockOrders {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let mut seen: Vec<&str> = Vec::new();

        for arrival in &self.arrivals {
            let item_name = arrival.item_name.as_str();
            if seen.contains(&item_name) {
                continue;
            }
            seen.push(item_name);

            match self.orchestrator.restock(ctx, item_name).await {
                Ok(outcomes) => {
                    tracing::debug!(item = item_name, orders = outcomes.len(), "restock applied");
                }
                Err(FulfillmentError::UnknownItem(item)) => {
                    tracing::warn!(%item, "arrival for item not on the menu, skipping");
                }
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }
}
