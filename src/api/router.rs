use super::AppState;
use super::handlers;
use axum::Router;
use axum::routing::{get, post};

/// Builds the router with every page and API route and the shared state.
/// Server-wide layers (metrics, tracing) are added by `ApiServer`.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/refresh", post(handlers::refresh_form))
        .route("/save", post(handlers::save_form))
        .route("/ip", post(handlers::backend_ip_form))
        .route("/api/state", get(handlers::get_state))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/save", post(handlers::save))
        .route("/api/ip", post(handlers::backend_ip))
        .with_state(state)
}
