//! Route table (§6) and shared middleware stack.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthcheck", get(handlers::healthcheck))
        .route("/api/question", post(handlers::question))
        .route("/api/register", post(handlers::register))
        .route("/api/register_worker", post(handlers::register_worker))
        .route("/api/receive_heart_beat", post(handlers::receive_heart_beat))
        .route("/api/get_worker_address", post(handlers::get_worker_address))
        .route("/api/list_language_models", post(handlers::list_language_models))
        .route("/api/list_multimodal_models", post(handlers::list_multimodal_models))
        .route("/api/refresh", get(handlers::refresh))
        .route("/api/fake", get(handlers::fake))
        .route("/api/refresh_all_workers", post(handlers::refresh_all_workers))
        .route("/api/worker_get_status", post(handlers::worker_get_status))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(185)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
