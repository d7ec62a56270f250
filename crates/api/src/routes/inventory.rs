//! Inventory intake and stock levels.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::orders::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddInventoryRequest {
    pub item_name: String,
    pub quantity: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub item_name: String,
    pub quantity: u32,
}

/// POST /inventory: adds prepared units and announces their arrival.
#[tracing::instrument(skip_all)]
pub async fn add(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddInventoryRequest>,
) -> Result<Json<StockLevel>, ApiError> {
    let quantity = state
        .engine
        .add_inventory(&req.item_name, req.quantity)
        .await?;
    tracing::info!(item = %req.item_name, added = req.quantity, quantity, "inventory received");
    Ok(Json(StockLevel {
        item_name: req.item_name,
        quantity,
    }))
}

/// GET /inventory: current count per stocked item.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, u32>> {
    Json(state.engine.ledger().snapshot())
}
