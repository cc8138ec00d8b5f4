//! Shared types for the Station 134 print pipeline
//!
//! Order wire models, currency parsing/formatting and the unified error
//! system used by the HTTP API.

pub mod error;
pub mod models;
pub mod money;
