use std::sync::Arc;

use async_trait::async_trait;
use messaging::Envelope;

use crate::command::{Command, CommandContext};
use crate::error::Result;
use crate::orchestrator::FulfillmentOrchestrator;

/// Handles `check-missing-items-on-orders`: re-derives every open order's
/// missing items from persisted state.
pub struct SweepMissingItems {
    orchestrator: Arc<FulfillmentOrchestrator>,
}

impl SweepMissingItems {
    pub const KIND: &'static str = "sweep-missing-items";

    pub fn new(orchestrator: Arc<FulfillmentOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn from_envelope(
        _envelope: &Envelope,
        orchestrator: Arc<FulfillmentOrchestrator>,
    ) -> Result<Box<dyn Command>> {
        Ok(Box::new(Self::new(orchestrator)))
    }
}

#[async_trait]
impl Command for SweepMissingItems {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        self.orchestrator.sweep(ctx).await.map(|_| ())
    }
}
