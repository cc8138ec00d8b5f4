//! Dedup ledger: order ids already handed to the printer
//!
//! A bounded FIFO set persisted in its own redb file. The dispatcher consults
//! it before printing and records an id right after a confirmed send, so an
//! order is never printed twice even when the store's printed flag could not
//! be updated.
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `processed` | `seq` (u64, insertion order) | `ProcessedRecord` (JSON) |
//! | `processed_by_order` | `order_id` | `seq` |

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const PROCESSED_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("processed");

const PROCESSED_BY_ORDER_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("processed_by_order");

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// One dispatched order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRecord {
    pub order_id: String,
    pub processed_at: DateTime<Utc>,
}

/// Durable FIFO-bounded set of processed order ids
#[derive(Clone)]
pub struct DedupLedger {
    db: Arc<Database>,
    capacity: usize,
}

impl std::fmt::Debug for DedupLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupLedger")
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl DedupLedger {
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> LedgerResult<Self> {
        let db = Database::create(path)?;
        Self::init(db, capacity)
    }

    /// Open an in-memory ledger (for testing)
    pub fn open_in_memory(capacity: usize) -> LedgerResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, capacity)
    }

    fn init(db: Database, capacity: usize) -> LedgerResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PROCESSED_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_BY_ORDER_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            capacity: capacity.max(1),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_processed(&self, order_id: &str) -> LedgerResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_BY_ORDER_TABLE)?;
        Ok(table.get(order_id)?.is_some())
    }

    /// Record an order as dispatched
    pub fn mark_processed(&self, order_id: &str) -> LedgerResult<()> {
        self.mark_processed_at(order_id, Utc::now())
    }

    /// Record an order as dispatched at `now`
    ///
    /// Re-marking a present id keeps its original position. Once the ledger
    /// grows past capacity the oldest records are evicted.
    pub fn mark_processed_at(&self, order_id: &str, now: DateTime<Utc>) -> LedgerResult<()> {
        let txn = self.db.begin_write()?;
        let evicted = {
            let mut by_order = txn.open_table(PROCESSED_BY_ORDER_TABLE)?;
            if by_order.get(order_id)?.is_some() {
                0
            } else {
                let mut records = txn.open_table(PROCESSED_TABLE)?;
                let seq = match records.last()? {
                    Some((key, _)) => key.value() + 1,
                    None => 0,
                };

                let record = ProcessedRecord {
                    order_id: order_id.to_string(),
                    processed_at: now,
                };
                let value = serde_json::to_vec(&record)?;
                records.insert(seq, value.as_slice())?;
                by_order.insert(order_id, seq)?;

                let mut evicted = 0;
                while records.len()? > self.capacity as u64 {
                    let Some((_, value)) = records.pop_first()? else {
                        break;
                    };
                    let old: ProcessedRecord = serde_json::from_slice(value.value())?;
                    by_order.remove(old.order_id.as_str())?;
                    evicted += 1;
                }
                evicted
            }
        };
        txn.commit()?;

        if evicted > 0 {
            tracing::debug!(evicted, "Evicted oldest ledger entries");
        }
        Ok(())
    }

    pub fn len(&self) -> LedgerResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_TABLE)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All records, oldest first
    pub fn records(&self) -> LedgerResult<Vec<ProcessedRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_TABLE)?;

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }
}
