pub mod config;
pub mod cors;
pub mod error;
pub mod proxy;

use axum::{Json, Router, middleware, response::IntoResponse, routing::get};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::proxy::GatewayState;

/// Builds the gateway router: `/health`, the proxy fallback for everything
/// under the configured prefix, CORS on every response and request tracing.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(proxy::forward)
        .with_state(state)
        .layer(middleware::from_fn(cors::cors))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
