// Route modules
pub mod health;
pub mod webhook;

use crate::{
    app_state::AppState,
    middleware::{logging_middleware, webhook_signature_middleware},
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the main API router
///
/// There is no router-wide timeout layer: dropping the handler future could
/// split the subscription insert from the entitlement merge. The webhook
/// handler bounds its own wait instead.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: AppState) -> Router<AppState> {
    // Provider callbacks must carry a valid body signature
    let webhook_routes = Router::new()
        .route("/webhooks/payment", post(webhook::payment_webhook))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            webhook_signature_middleware,
        ));

    Router::new()
        .merge(webhook_routes)
        .layer(middleware::from_fn_with_state(state, logging_middleware))
}
