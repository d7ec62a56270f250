use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::OrderNumber;
use domain::MenuCatalog;
use messaging::{Envelope, ItemQuantity};

use crate::command::{Command, CommandContext};
use crate::error::Result;
use crate::ledger::InventoryLedger;

/// The in-process kitchen: turns requests into stock after a delay.
#[derive(Clone)]
pub struct KitchenStation {
    catalog: Arc<MenuCatalog>,
    ledger: Arc<InventoryLedger>,
    time_scale: f64,
}

impl KitchenStation {
    /// `time_scale` multiplies every preparation duration; `0.0` prepares
    /// instantly.
    pub fn new(catalog: Arc<MenuCatalog>, ledger: Arc<InventoryLedger>, time_scale: f64) -> Self {
        let time_scale = if time_scale.is_finite() && time_scale > 0.0 {
            time_scale
        } else {
            0.0
        };
        Self {
            catalog,
            ledger,
            time_scale,
        }
    }

    pub fn preparation_time(&self, item_name: &str) -> Result<Duration> {
        let base = self.catalog.preparation_duration(item_name)?;
        Ok(Duration::try_from_secs_f64(base.as_secs_f64() * self.time_scale).unwrap_or(Duration::ZERO))
    }
}

/// Handles `request-item`: prepares the requested units and adds them to
/// the ledger, which announces their arrival.
pub struct PrepareItems {
    order_number: OrderNumber,
    requests: Vec<ItemQuantity>,
    station: KitchenStation,
}

impl PrepareItems {
    pub const KIND: &'static str = "prepare-items";

    pub fn from_envelope(envelope: &Envelope, station: KitchenStation) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self {
            order_number: envelope.order_number()?,
            requests: envelope.decode()?,
            station,
        }))
    }
}

#[async_trait]
impl Command for PrepareItems {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    #[tracing::instrument(skip_all, fields(order_number = %self.order_number))]
    async fn execute(&self, _ctx: &CommandContext) -> Result<()> {
        // Validate the whole request before cooking anything.
        let mut plan = Vec::with_capacity(self.requests.len());
        for request in &self.requests {
            plan.push((request, self.station.preparation_time(&request.item_name)?));
        }

        for (request, preparation_time) in plan {
            if request.quantity == 0 {
                continue;
            }
            tracing::debug!(
                item = %request.item_name,
                quantity = request.quantity,
                ?preparation_time,
                "preparing"
            );
            if !preparation_time.is_zero() {
                tokio::time::sleep(preparation_time).await;
            }
            self.station
                .ledger
                .add_many(&request.item_name, request.quantity)
                .await;
        }

        Ok(())
    }
}
