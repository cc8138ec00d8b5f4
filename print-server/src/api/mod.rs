//! HTTP API
//!
//! - [`orders`] - order intake, unprinted feed, printed acknowledgement
//! - [`health`] - liveness and component status

pub mod health;
pub mod middleware;
pub mod orders;

use std::time::Duration;

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::core::ServerState;

/// Order payloads are small; anything larger is rejected before parsing
const MAX_BODY_BYTES: usize = 256 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application router with state and middleware applied
pub fn build_app(state: ServerState) -> Router {
    Router::new()
        .merge(orders::router())
        .merge(health::router())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
}
