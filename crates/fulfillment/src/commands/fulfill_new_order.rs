use std::sync::Arc;

use async_trait::async_trait;
use common::OrderNumber;
use messaging::Envelope;

use crate::command::{Command, CommandContext};
use crate::error::Result;
use crate::orchestrator::FulfillmentOrchestrator;

/// Handles `order-placed`: covers a new order from stock and the kitchen.
pub struct FulfillNewOrder {
    order_number: OrderNumber,
    orchestrator: Arc<FulfillmentOrchestrator>,
}

impl FulfillNewOrder {
    pub const KIND: &'static str = "fulfill-new-order";

    pub fn new(order_number: OrderNumber, orchestrator: Arc<FulfillmentOrchestrator>) -> Self {
        Self {
            order_number,
            orchestrator,
        }
    }

    pub fn from_envelope(
        envelope: &Envelope,
        orchestrator: Arc<FulfillmentOrchestrator>,
    ) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self::new(envelope.order_number()?, orchestrator)))
    }
}

#[async_trait]
impl Command for FulfillNewOrder {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        self.orchestrator
            .fulfill_new_order(ctx, self.order_number)
            .await
            .map(|_| ())
    }
}
