use async_trait::async_trait;
use common::OrderNumber;
use domain::OrderStatus;
use messaging::Envelope;

use crate::command::{Command, CommandContext};
use crate::error::Result;
use crate::notifications::StatusUpdate;

/// Handles `order-status-updated` by recording it in logs and metrics.
pub struct RecordStatusUpdate {
    order_number: OrderNumber,
    status: OrderStatus,
}

impl RecordStatusUpdate {
    pub const KIND: &'static str = "record-status-update";

    pub fn from_envelope(envelope: &Envelope) -> Result<Box<dyn Command>> {
        let update: StatusUpdate = envelope.decode()?;
        Ok(Box::new(Self {
            order_number: envelope.order_number()?,
            status: update.status,
        }))
    }
}

#[async_trait]
impl Command for RecordStatusUpdate {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn execute(&self, _ctx: &CommandContext) -> Result<()> {
        metrics::counter!("order_status_updates_total", "status" => self.status.as_str())
            .increment(1);
        tracing::info!(order_number = %self.order_number, status = %self.status, "order status updated");
        Ok(())
    }
}
