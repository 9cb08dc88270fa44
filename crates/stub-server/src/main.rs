//! Stub server entry point.

use std::sync::Arc;

use common::Money;
use stub_server::AppState;
use stub_server::config::Config;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for SIGINT or SIGTERM.
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
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

/// A few products with limited stock so conflicts can be tried by hand.
fn seed(state: &AppState) {
    for (id, stock, price) in [
        ("prod_0000000001", 5, 120),
        ("prod_0000000002", 2, 45),
        ("prod_0000000003", 0, 80),
    ] {
        state.cart.set_stock(id, stock);
        state.cart.set_price(id, Money::from_major(price));
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let state = AppState::new(config.require_auth);
    seed(&state);
    let app = stub_server::create_app(Arc::new(state), metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, require_auth = config.require_auth, "starting stub server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("stub server stopped");
}
