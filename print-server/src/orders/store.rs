//! redb-based order mailbox
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Order records |
//! | `orders_by_time` | `(timestamp_millis, order_id)` | `()` | Feed ordering and retention sweep |
//!
//! # Durability
//!
//! Every mutating call commits its own write transaction before returning.
//! redb commits with `Durability::Immediate` by default, so a returned id
//! survives a crash or power loss.
//!
//! # Retention
//!
//! Orders older than the retention window are dropped inside every append
//! transaction and by the periodic sweeper, printed or not.

use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::models::{Order, OrderIntake, generate_order_id};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Orders table: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Index: (timestamp millis, order_id) -> ()
const ORDERS_BY_TIME_TABLE: TableDefinition<(i64, &str), ()> =
    TableDefinition::new("orders_by_time");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
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

pub type StorageResult<T> = Result<T, StorageError>;

/// Result of [`OrderStore::mark_printed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    AlreadyPrinted,
    NotFound,
}

/// Storage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub total: u64,
    pub unprinted: u64,
}

/// Durable order mailbox backed by redb
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<Database>,
    retention: chrono::Duration,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore")
            .field("retention_mins", &self.retention.num_minutes())
            .finish()
    }
}

impl OrderStore {
    /// Open or create the database at the given path
    ///
    /// redb holds an exclusive lock on the file, so one process owns the store.
    pub fn open(path: impl AsRef<Path>, retention: chrono::Duration) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db, retention)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(retention: chrono::Duration) -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, retention)
    }

    fn init(db: Database, retention: chrono::Duration) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_BY_TIME_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            retention,
        })
    }

    pub fn retention(&self) -> chrono::Duration {
        self.retention
    }

    // ========== Intake ==========

    /// Store a paid order and return its id
    pub fn append(&self, intake: OrderIntake) -> StorageResult<String> {
        self.append_at(intake, Utc::now())
    }

    /// Store a paid order as received at `now`
    ///
    /// The gateway's payment id becomes the order id when present. Appending an
    /// id that is already stored returns it unchanged.
    pub fn append_at(&self, intake: OrderIntake, now: DateTime<Utc>) -> StorageResult<String> {
        let id = intake
            .payment_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| generate_order_id(now));

        let txn = self.db.begin_write()?;
        let swept = Self::sweep_in_txn(&txn, now - self.retention)?;
        let created = {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            if orders.get(id.as_str())?.is_some() {
                false
            } else {
                let order = Order::from_intake(intake, id.clone(), now);
                let value = serde_json::to_vec(&order)?;
                orders.insert(id.as_str(), value.as_slice())?;

                let mut index = txn.open_table(ORDERS_BY_TIME_TABLE)?;
                index.insert((now.timestamp_millis(), id.as_str()), ())?;
                true
            }
        };
        txn.commit()?;

        if swept > 0 {
            tracing::info!(swept, "Dropped expired orders");
        }
        if created {
            tracing::info!(order_id = %id, "Order stored");
        } else {
            tracing::info!(order_id = %id, "Order already stored, ignoring duplicate");
        }
        Ok(id)
    }

    // ========== Queries ==========

    /// Unprinted orders inside the retention window, oldest first
    pub fn list_unprinted(&self) -> StorageResult<Vec<Order>> {
        self.list_unprinted_at(Utc::now())
    }

    pub fn list_unprinted_at(&self, now: DateTime<Utc>) -> StorageResult<Vec<Order>> {
        let cutoff = (now - self.retention).timestamp_millis();

        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ORDERS_BY_TIME_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;

        let mut result = Vec::new();
        for entry in index.range((cutoff, "")..)? {
            let (key, _) = entry?;
            let (_, order_id) = key.value();
            let Some(guard) = orders.get(order_id)? else {
                tracing::warn!(order_id = %order_id, "Index entry without order record");
                continue;
            };
            let order: Order = serde_json::from_slice(guard.value())?;
            if !order.printed {
                result.push(order);
            }
        }
        Ok(result)
    }

    /// Get an order by id
    pub fn get(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn stats(&self) -> StorageResult<StoreStats> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut unprinted = 0;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let order: Order = serde_json::from_slice(value.value())?;
            if !order.printed {
                unprinted += 1;
            }
        }

        Ok(StoreStats {
            total: table.len()?,
            unprinted,
        })
    }

    // ========== Mutations ==========

    /// Flag an order as printed
    ///
    /// Never fails for unknown or already printed ids; the outcome says which.
    pub fn mark_printed(&self, order_id: &str) -> StorageResult<MarkOutcome> {
        let txn = self.db.begin_write()?;
        let outcome = {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            let existing = table.get(order_id)?.map(|guard| guard.value().to_vec());
            match existing {
                None => MarkOutcome::NotFound,
                Some(bytes) => {
                    let mut order: Order = serde_json::from_slice(&bytes)?;
                    if order.printed {
                        MarkOutcome::AlreadyPrinted
                    } else {
                        order.printed = true;
                        let value = serde_json::to_vec(&order)?;
                        table.insert(order_id, value.as_slice())?;
                        MarkOutcome::Marked
                    }
                }
            }
        };
        txn.commit()?;

        match outcome {
            MarkOutcome::Marked => tracing::info!(order_id = %order_id, "Order marked as printed"),
            MarkOutcome::AlreadyPrinted => {
                tracing::debug!(order_id = %order_id, "Order was already printed")
            }
            MarkOutcome::NotFound => {
                tracing::warn!(order_id = %order_id, "Mark printed for unknown order")
            }
        }
        Ok(outcome)
    }

    /// Drop orders older than the retention window
    pub fn sweep_expired(&self) -> StorageResult<usize> {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let txn = self.db.begin_write()?;
        let swept = Self::sweep_in_txn(&txn, now - self.retention)?;
        txn.commit()?;

        if swept > 0 {
            tracing::info!(swept, "Dropped expired orders");
        }
        Ok(swept)
    }

    /// Remove every order stamped strictly before `cutoff` (within transaction)
    fn sweep_in_txn(txn: &WriteTransaction, cutoff: DateTime<Utc>) -> StorageResult<usize> {
        let cutoff = cutoff.timestamp_millis();
        let mut index = txn.open_table(ORDERS_BY_TIME_TABLE)?;
        let mut orders = txn.open_table(ORDERS_TABLE)?;

        // Collect first, then remove
        let mut expired: Vec<(i64, String)> = Vec::new();
        for entry in index.range(..(cutoff, ""))? {
            let (key, _) = entry?;
            let (millis, order_id) = key.value();
            expired.push((millis, order_id.to_string()));
        }

        for (millis, order_id) in &expired {
            index.remove((*millis, order_id.as_str()))?;
            orders.remove(order_id.as_str())?;
        }
        Ok(expired.len())
    }
}
