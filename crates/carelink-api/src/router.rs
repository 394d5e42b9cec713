//! Route definitions for the CareLink HTTP surface.
//!
//! The router receives `AppState` and passes it to all handlers via
//! Axum's `State` extractor.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(rpc_routes())
        .merge(ingestion_routes())
        .merge(dashboard_routes())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&state))
        .with_state(state)
}

/// Synchronous RPC facade: publish + read-only lookups
fn rpc_routes() -> Router<AppState> {
    Router::new()
        .route("/rpc/publish-event", post(handlers::rpc::publish_event))
        .route("/rpc/users/:id", get(handlers::rpc::get_user))
        .route(
            "/rpc/users/:id/device-tokens",
            get(handlers::rpc::get_device_tokens),
        )
        .route("/rpc/users/:id/checkins", get(handlers::rpc::get_check_ins))
        .route("/rpc/health", get(handlers::rpc::health))
}

/// Endpoints the CRUD layer calls to feed the pipeline
fn ingestion_routes() -> Router<AppState> {
    Router::new()
        .route("/checkin", post(handlers::events::checkin))
        .route("/daily-login", post(handlers::events::daily_login))
        .route("/send-sms", post(handlers::events::send_sms))
        .route("/send-urgent-sms", post(handlers::events::send_urgent_sms))
        .route(
            "/save-device-token",
            post(handlers::device::save_device_token),
        )
}

/// Live stream and history for the dashboard consumer
fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stream", get(handlers::dashboard::stream))
        .route("/dashboard/history", get(handlers::dashboard::history))
        .route(
            "/dashboard/history/:id/read",
            post(handlers::dashboard::mark_read),
        )
}

/// CORS policy from configuration. `["*"]` means any origin.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.server.cors.allowed_origins;
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<axum::http::HeaderValue> =
            origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(parsed)
    }
}
