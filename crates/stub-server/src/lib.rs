//! Development stub of the storefront REST backend.
//!
//! Serves the in-memory collaborators from the `backend` crate under `/api`
//! with the same paths, bodies and error shapes the HTTP client expects, so
//! the cart and checkout can be driven end to end without the real service.
//! It is a fixture for local development and the `HttpBackend` tests, not a
//! backend to deploy: state lives in memory and tokens are not verified.
//! One shared cart: every bearer token sees the same lines.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use backend::{DistanceShippingQuoter, InMemoryCartApi, InMemoryOrderApi, InMemoryPaymentApi};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
///
/// The collaborators are cheap handles onto shared state, so a test can keep
/// clones and inspect what the server received.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub cart: InMemoryCartApi,
    pub orders: InMemoryOrderApi,
    pub shipping: DistanceShippingQuoter,
    pub payments: InMemoryPaymentApi,
    pub require_auth: bool,
}

impl AppState {
    pub fn new(require_auth: bool) -> Self {
        Self {
            require_auth,
            ..Self::default()
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/cart", get(routes::cart::list).delete(routes::cart::clear))
        .route("/cart/set", post(routes::cart::set))
        .route("/cart/item/{id}", delete(routes::cart::remove))
        .route("/cart/merge", post(routes::cart::merge))
        .route("/orders", post(routes::orders::create))
        .route("/orders/{id}", patch(routes::orders::update))
        .route("/shipping/quote", post(routes::shipping::quote))
        .route("/pay/paypal/create-order", post(routes::payments::paypal_create))
        .route("/pay/stc/create", post(routes::payments::stc_create))
        .route("/pay/stc/confirm", post(routes::payments::stc_confirm))
        .route("/pay/bank/init", post(routes::payments::bank_init))
        .route("/pay/bank/upload", post(routes::payments::bank_upload))
        .route("/pay/cod/enable", post(routes::payments::cod_enable));

    Router::new()
        .route("/health", get(routes::ops::health))
        .nest("/api", api)
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
