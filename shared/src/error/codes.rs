//! Error codes returned in the `code` field of failed API responses
//!
//! | Range | Meaning |
//! |-------|---------|
//! | 4-5 | request level (malformed body, missing field) |
//! | 4000-4099 | order rejected at intake |
//! | 4100-4199 | item rejected at intake |
//! | 9000-9999 | server side failure |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire error code, serialized as a bare number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    /// Body is not valid JSON or has the wrong shape
    InvalidRequest = 4,
    RequiredField = 5,

    OrderNotFound = 4001,
    OrderEmpty = 4002,
    OrderTableMissing = 4003,
    /// Total is zero or negative
    OrderTotalInvalid = 4004,
    TipInvalid = 4005,

    ItemNameMissing = 4101,
    /// Quantity is zero, negative or absurdly large
    ItemQuantityInvalid = 4102,
    /// Price string cannot be read as euros
    ItemPriceInvalid = 4103,

    /// Order store or ledger failure
    DatabaseError = 9002,
    /// The instance owning the order store did not accept a forwarded request
    FeedUnavailable = 9003,
}

/// Every code, in wire order
const ALL_CODES: [ErrorCode; 12] = [
    ErrorCode::InvalidRequest,
    ErrorCode::RequiredField,
    ErrorCode::OrderNotFound,
    ErrorCode::OrderEmpty,
    ErrorCode::OrderTableMissing,
    ErrorCode::OrderTotalInvalid,
    ErrorCode::TipInvalid,
    ErrorCode::ItemNameMissing,
    ErrorCode::ItemQuantityInvalid,
    ErrorCode::ItemPriceInvalid,
    ErrorCode::DatabaseError,
    ErrorCode::FeedUnavailable,
];

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default English message
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",

            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::OrderTableMissing => "Order table is missing",
            ErrorCode::OrderTotalInvalid => "Order total must be positive",
            ErrorCode::TipInvalid => "Tip must not be negative",

            ErrorCode::ItemNameMissing => "Item name is missing",
            ErrorCode::ItemQuantityInvalid => "Item quantity must be positive",
            ErrorCode::ItemPriceInvalid => "Item price is invalid",

            ErrorCode::DatabaseError => "Database error",
            ErrorCode::FeedUnavailable => "Order feed owner unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// A number that is not one of the known codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ALL_CODES
            .into_iter()
            .find(|code| code.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
