//! Router configuration.

use crate::handlers::{deliver_order, health_check, order_quantities, order_report};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `GET /health`
/// - `GET /api/v1/reports/orders`
/// - `GET /api/v1/orders/:id/quantities`
/// - `POST /api/v1/orders/:id/deliver`
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/reports/orders", get(order_report))
        .route("/orders/:id/quantities", get(order_quantities))
        .route("/orders/:id/deliver", post(deliver_order));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
