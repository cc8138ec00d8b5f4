use thiserror::Error;

/// Why a job did not reach the printer
///
/// None of these are retried here; the dispatcher leaves the order unprinted
/// and tries again on its next tick.
#[derive(Debug, Error)]
pub enum PrintError {
    /// Refused, unreachable, or the host did not resolve
    #[error("cannot connect to printer at {addr}: {reason}")]
    Connection { addr: String, reason: String },

    /// Socket failed after the connection was up
    #[error("printer I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("printer at {addr} timed out during {stage}")]
    Timeout { addr: String, stage: &'static str },

    #[error("invalid printer settings: {0}")]
    InvalidConfig(String),
}

pub type PrintResult<T> = Result<T, PrintError>;
