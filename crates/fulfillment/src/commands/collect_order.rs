use std::sync::Arc;

use async_trait::async_trait;
use common::OrderNumber;
use domain::{OrderError, OrderRepository};
use messaging::{Envelope, Notifier};

use crate::command::{Command, CommandContext};
use crate::error::{FulfillmentError, Result};
use crate::notifications::notify_status;

/// Handles `order-collected`: hands a ready order to the customer.
pub struct CollectOrder {
    order_number: OrderNumber,
    repository: Arc<dyn OrderRepository>,
    notifier: Notifier,
}

impl CollectOrder {
    pub const KIND: &'static str = "collect-order";

    pub fn new(
        order_number: OrderNumber,
        repository: Arc<dyn OrderRepository>,
        notifier: Notifier,
    ) -> Self {
        Self {
            order_number,
            repository,
            notifier,
        }
    }

    pub fn from_envelope(
        envelope: &Envelope,
        repository: Arc<dyn OrderRepository>,
        notifier: Notifier,
    ) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self::new(
            envelope.order_number()?,
            repository,
            notifier,
        )))
    }
}

#[async_trait]
impl Command for CollectOrder {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    #[tracing::instrument(skip_all, fields(order_number = %self.order_number))]
    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let mut order = ctx
            .within(async {
                self.repository
                    .get(self.order_number)
                    .await
                    .map_err(FulfillmentError::from)
            })
            .await?
            .ok_or(OrderError::NotFound(self.order_number))?;

        if !order.collect()? {
            tracing::debug!("order already collected");
            return Ok(());
        }

        ctx.within(async {
            self.repository
                .upsert(&order)
                .await
                .map_err(FulfillmentError::from)
        })
        .await?;

        notify_status(&self.notifier, &order).await;
        tracing::info!("order collected");
        Ok(())
    }
}
