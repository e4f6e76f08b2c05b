//! HTTP API

pub mod catalog;
pub mod health;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Build the application router
pub fn create_router(state: ServerState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(health::router())
        .merge(catalog::router())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
