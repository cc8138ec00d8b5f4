//! Shared server state
//!
//! Cloned into every axum handler; all members are cheap handles.

use std::sync::Arc;
use std::time::Instant;

use station_printer::NetworkPrinter;

use super::{Config, Result};
use crate::orders::{DedupLedger, HttpOrderFeed, OrderStore};
use crate::printing::ReceiptRenderer;

#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    /// Local order mailbox (redb, exclusively owned by this process)
    pub store: OrderStore,
    /// Present only when this instance runs the dispatcher
    pub ledger: Option<DedupLedger>,
    /// Feed owner (`FEED_URL`); when set, order routes forward there
    pub feed: Option<HttpOrderFeed>,
    pub printer: Arc<NetworkPrinter>,
    pub started_at: Instant,
}

impl ServerState {
    /// Open databases and build the printer from configuration
    ///
    /// Creates the work directory if needed.
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let store = OrderStore::open(config.orders_db_path(), config.retention())?;
        tracing::info!(path = %config.orders_db_path().display(), "Order store opened");

        let ledger = if config.dispatcher_enabled {
            let ledger = DedupLedger::open(config.ledger_db_path(), config.ledger_capacity)?;
            tracing::info!(
                path = %config.ledger_db_path().display(),
                entries = ledger.len()?,
                "Dedup ledger opened"
            );
            Some(ledger)
        } else {
            None
        };

        let feed = match &config.feed_url {
            Some(url) => {
                let feed = HttpOrderFeed::new(url, config.printer_timeout())?;
                tracing::info!(feed = %feed.orders_url(), "Order routes forward to feed owner");
                Some(feed)
            }
            None => None,
        };

        Ok(Self {
            config: config.clone(),
            store,
            ledger,
            feed,
            printer: Arc::new(build_printer(config)?),
            started_at: Instant::now(),
        })
    }

    /// Build state around an existing store, without a ledger (tests, embedding)
    pub fn with_store(config: Config, store: OrderStore) -> Result<Self> {
        let printer = Arc::new(build_printer(&config)?);
        Ok(Self {
            config,
            store,
            ledger: None,
            feed: None,
            printer,
            started_at: Instant::now(),
        })
    }

    /// Forward order routes to another instance's store
    pub fn with_feed(mut self, feed: HttpOrderFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn renderer(&self) -> ReceiptRenderer {
        ReceiptRenderer::new(self.config.timezone, self.config.printer_charset)
            .with_open_drawer(self.config.printer_open_drawer)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub fn build_printer(config: &Config) -> Result<NetworkPrinter> {
    Ok(
        NetworkPrinter::new(&config.printer_host, config.printer_port)?
            .with_timeout(config.printer_timeout())
            .with_settle_delay(config.printer_settle_delay()),
    )
}
