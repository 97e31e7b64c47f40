//! API module - HTTP handlers and routes

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::realtime::ws_handler;
use crate::state::AppState;

pub fn routes(webhook_path: &str, max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        // Liveness
        .route("/", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        // Platform lifecycle callbacks
        .route(
            webhook_path,
            post(handlers::webhook).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        // Real-time clients
        .route("/ws", get(ws_handler))
}
