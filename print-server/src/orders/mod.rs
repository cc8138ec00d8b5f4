//! Order intake storage
//!
//! - [`OrderStore`]: durable mailbox of paid orders (redb)
//! - [`DedupLedger`]: bounded record of orders already sent to the printer
//! - [`OrderSource`]: local store or remote HTTP feed, as seen by the dispatcher

pub mod ledger;
pub mod source;
pub mod store;

pub use ledger::{DedupLedger, LedgerError, LedgerResult, ProcessedRecord};
pub use source::{HttpOrderFeed, OrderSource, SourceError, SourceResult};
pub use store::{MarkOutcome, OrderStore, StorageError, StorageResult, StoreStats};
