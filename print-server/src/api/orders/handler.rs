//! Order API Handlers
//!
//! With `FEED_URL` set the order store of record lives on another instance;
//! these routes then forward there instead of touching the local store.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Serialize;
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{MarkPrintedRequest, Order, OrderIntake};

use crate::core::ServerState;
use crate::orders::{MarkOutcome, OrderSource, SourceError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    order_id: String,
}

fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::invalid_request(rejection.body_text())
}

fn feed_error(e: SourceError) -> AppError {
    AppError::feed_unavailable(e.to_string())
}

/// Store a paid order
pub async fn create(
    State(state): State<ServerState>,
    payload: Result<Json<OrderIntake>, JsonRejection>,
) -> AppResult<ApiResponse<CreatedOrder>> {
    let Json(intake) = payload.map_err(bad_json)?;
    intake.validate()?;

    let order_id = match &state.feed {
        Some(feed) => feed.submit(&intake).await.map_err(feed_error)?,
        None => state
            .store
            .append(intake)
            .map_err(|e| AppError::database(e.to_string()))?,
    };

    Ok(ApiResponse::success(CreatedOrder { order_id }))
}

/// Unprinted orders inside the retention window, oldest first
pub async fn list_unprinted(State(state): State<ServerState>) -> AppResult<Json<Vec<Order>>> {
    let orders = match &state.feed {
        Some(feed) => feed.list_unprinted().await.map_err(feed_error)?,
        None => state
            .store
            .list_unprinted()
            .map_err(|e| AppError::database(e.to_string()))?,
    };
    Ok(Json(orders))
}

/// Acknowledge a printed order
pub async fn mark_printed(
    State(state): State<ServerState>,
    payload: Result<Json<MarkPrintedRequest>, JsonRejection>,
) -> AppResult<ApiResponse<()>> {
    let Json(req) = payload.map_err(bad_json)?;
    let order_id = req.order_id.trim();
    if order_id.is_empty() {
        return Err(AppError::new(ErrorCode::RequiredField).with_detail("field", "orderId"));
    }

    let outcome = match &state.feed {
        Some(feed) => feed.acknowledge(order_id).await.map_err(feed_error)?,
        None => state
            .store
            .mark_printed(order_id)
            .map_err(|e| AppError::database(e.to_string()))?,
    };

    match outcome {
        MarkOutcome::Marked | MarkOutcome::AlreadyPrinted => Ok(ApiResponse::ok()),
        MarkOutcome::NotFound => {
            Err(AppError::new(ErrorCode::OrderNotFound).with_detail("orderId", order_id))
        }
    }
}
