//! `AppError` and the JSON envelope every order endpoint answers with

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field-level context attached to a failure, e.g. the offending item index
pub type ErrorDetails = BTreeMap<String, Value>;

#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<ErrorDetails>,
}

impl AppError {
    /// Error carrying the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Store or ledger failure; the message is logged, not interpreted
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// The feed owner refused or could not be reached
    pub fn feed_unavailable(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::FeedUnavailable, msg)
    }

    /// Body that is not JSON or does not match the expected shape
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }
}

/// Response envelope
///
/// Success: `{"success": true, ...payload fields}`.
/// Failure: `{"success": false, "code": 4002, "error": "...", "details": {...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<ErrorDetails>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    payload: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Success with `payload`'s fields merged into the top-level object
    pub fn success(payload: T) -> Self {
        Self {
            success: true,
            code: None,
            error: None,
            details: None,
            payload: Some(payload),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    fn status(&self) -> StatusCode {
        self.code.map_or(StatusCode::OK, |c| c.http_status())
    }
}

impl ApiResponse<()> {
    /// Bare `{"success": true}`
    pub fn ok() -> Self {
        Self {
            success: true,
            code: None,
            error: None,
            details: None,
            payload: None,
        }
    }

    pub fn error(err: &AppError) -> Self {
        Self {
            success: false,
            code: Some(err.code),
            error: Some(err.message.clone()),
            details: err.details.clone(),
            payload: None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.code.category() {
            ErrorCategory::System => {
                tracing::error!(code = %self.code, message = %self.message, "Request failed on the server side");
            }
            ErrorCategory::Request | ErrorCategory::Intake => {
                tracing::debug!(code = %self.code, message = %self.message, details = ?self.details, "Request rejected");
            }
        }
        ApiResponse::error(&self).into_response()
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
