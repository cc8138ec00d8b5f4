//! Coarse error classes derived from the code range

use super::codes::ErrorCode;
use serde::Serialize;

/// Who is at fault: the caller or the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request (0-99)
    Request,
    /// Order or item rejected at intake (4xxx)
    Intake,
    /// Server side failure (9xxx), logged when returned
    System,
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            0..100 => ErrorCategory::Request,
            4000..5000 => ErrorCategory::Intake,
            _ => ErrorCategory::System,
        }
    }
}
