//! HTTP shell for the kitchen order fulfillment engine.
//!
//! Provides REST endpoints for order placement, lookup, pickup and inventory
//! intake, with structured logging (tracing) and Prometheus metrics. The
//! engine itself consumes the message topic on a background task.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{InMemoryOrderRepository, MenuCatalog};
use fulfillment::FulfillmentEngine;
use messaging::{InMemoryBroker, Transport};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders", get(routes::orders::list))
        .route("/orders/sweep", post(routes::orders::sweep))
        .route("/orders/{order_number}", get(routes::orders::get))
        .route(
            "/orders/{order_number}/collect",
            post(routes::orders::collect),
        )
        .route("/inventory", get(routes::inventory::list))
        .route("/inventory", post(routes::inventory::add))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wraps an engine in shared state.
pub fn create_state(engine: Arc<FulfillmentEngine>, topic: impl Into<String>) -> Arc<AppState> {
    Arc::new(AppState {
        engine,
        topic: topic.into(),
    })
}

/// Creates the single-process deployment: in-memory broker, in-memory order
/// store and the standard menu.
pub fn create_default_state(config: &Config) -> (Arc<AppState>, InMemoryBroker) {
    let broker = InMemoryBroker::streaming();
    let transport: Arc<dyn Transport> = Arc::new(broker.transport(config.topic.clone()));
    let engine = Arc::new(FulfillmentEngine::new(
        transport,
        Arc::new(InMemoryOrderRepository::new()),
        Arc::new(MenuCatalog::standard()),
        config.engine_config(),
    ));

    (create_state(engine, config.topic.topic.clone()), broker)
}
