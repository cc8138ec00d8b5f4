//! Error codes and the JSON error envelope shared by the API and its clients
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::OrderTableMissing).with_detail("field", "table");
//! assert_eq!(err.http_status(), http::StatusCode::BAD_REQUEST);
//! let body = ApiResponse::error(&err);
//! assert!(!body.is_success());
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult, ErrorDetails};
