//! Order API Module
//!
//! | Path | Method | Purpose |
//! |------|--------|---------|
//! | /orders | POST | store a paid order |
//! | /orders | GET | unprinted orders, oldest first |
//! | /orders/mark-printed | POST | acknowledge a printed order |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/orders", get(handler::list_unprinted).post(handler::create))
        .route("/orders/mark-printed", post(handler::mark_printed))
}
