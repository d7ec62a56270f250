//! Order placement, lookup and pickup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CustomerId, OrderNumber};
use domain::{Item, Order, OrderFilter};
use fulfillment::FulfillmentEngine;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub engine: Arc<FulfillmentEngine>,
    /// Topic the engine consumes, reported by `/health`.
    pub topic: String,
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: i64,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListOrdersQuery {
    /// `open` (default) or `all`.
    pub status: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub missing_items: Vec<Item>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            missing_items: order.missing_items(),
            order,
        }
    }
}

#[derive(Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
}

// -- Handlers --

/// POST /orders: places an order and announces it for fulfillment.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let items = req
        .items
        .into_iter()
        .map(|item| Item::new(item.name, item.quantity))
        .collect();

    let order = state
        .engine
        .place_order(CustomerId::new(req.customer_id), items)
        .await?;

    tracing::info!(order_number = %order.order_number(), "order placed");
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/{order_number}: returns the persisted order.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_number = parse_order_number(&order_number)?;
    let order = state
        .engine
        .orders()
        .get_order(order_number)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {order_number}")))?;
    Ok(Json(order.into()))
}

/// GET /orders: lists orders in ascending order number.
#[tracing::instrument(skip(state))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let filter = match query.status.as_deref() {
        None | Some("open") => OrderFilter::open(),
        Some("all") => OrderFilter::all(),
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Unknown status filter: {other} (expected open or all)"
            )));
        }
    };

    let orders = state.engine.orders().list_orders(&filter).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// POST /orders/{order_number}/collect: requests pickup of a ready order.
///
/// The status change is applied asynchronously by the engine.
#[tracing::instrument(skip(state))]
pub async fn collect(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order_number = parse_order_number(&order_number)?;
    let order = state.engine.collect_order(order_number).await?;
    Ok((StatusCode::ACCEPTED, Json(order.into())))
}

/// POST /orders/sweep: asks the engine to re-check every open order.
#[tracing::instrument(skip(state))]
pub async fn sweep(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    state.engine.request_sweep().await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse { status: "accepted" }),
    ))
}

fn parse_order_number(raw: &str) -> Result<OrderNumber, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid order number: {raw}")))
}
