//! API server entry point.

use api::config::Config;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build the engine over the configured topic
    let (state, _broker) = api::create_default_state(&config);
    tracing::info!(
        brokers = %config.topic.bootstrap_servers(),
        topic = %config.topic.topic,
        kitchen_enabled = config.kitchen_enabled,
        "engine configured"
    );

    // 4. Start consuming
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let engine = state.engine.clone();
    let consumer = tokio::spawn(async move {
        engine
            .run(async move {
                let _ = stop_rx.changed().await;
            })
            .await
    });

    // 5. Build the application
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Stop the consumer and drain pending notifications
    let _ = stop_tx.send(true);
    match consumer.await {
        Ok(Ok(())) => tracing::info!("engine stopped"),
        Ok(Err(error)) => tracing::error!(%error, "engine stopped with error"),
        Err(error) => tracing::error!(%error, "engine task failed"),
    }

    tracing::info!("server shut down gracefully");
}
