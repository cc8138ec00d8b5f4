use thiserror::Error;

use super::config::ConfigError;
use crate::orders::{LedgerError, SourceError, StorageError};

/// Startup and runtime errors of the server process
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Order store error: {0}")]
    Storage(#[from] StorageError),

    #[error("Dedup ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Printer error: {0}")]
    Printer(#[from] station_printer::PrintError),

    #[error("Order feed error: {0}")]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
