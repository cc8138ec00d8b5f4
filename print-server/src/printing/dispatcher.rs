//! Order dispatcher
//!
//! Polls the order source, prints every unprinted order once and
//! acknowledges it. The dedup ledger is committed before the source is told,
//! so a lost acknowledgement can never lead to a second receipt.
//!
//! ```text
//! Unprinted ──render──▶ Sending ──ok──▶ ledger.mark ──▶ source.mark_printed
//!                          │
//!                          └──err──▶ stays unprinted, retried next tick
//! ```

use std::sync::Arc;
use std::time::Duration;

use shared::models::Order;
use station_printer::Printer;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::renderer::ReceiptRenderer;
use crate::orders::{DedupLedger, OrderSource};

/// Outcome of one dispatcher tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub printed: usize,
    pub already_processed: usize,
    pub failed: usize,
    /// Another tick was still running; nothing was done
    pub overlapped: bool,
}

/// Per-order result inside a tick
enum Dispatch {
    Printed,
    AlreadyProcessed,
    Failed,
}

pub struct Dispatcher<P: Printer> {
    printer: Arc<P>,
    source: Arc<dyn OrderSource>,
    ledger: DedupLedger,
    renderer: ReceiptRenderer,
    guard: Mutex<()>,
}

impl<P: Printer> Dispatcher<P> {
    pub fn new(
        printer: Arc<P>,
        source: Arc<dyn OrderSource>,
        ledger: DedupLedger,
        renderer: ReceiptRenderer,
    ) -> Self {
        Self {
            printer,
            source,
            ledger,
            renderer,
            guard: Mutex::new(()),
        }
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Run one polling round
    ///
    /// Returns immediately with `overlapped` set when another round is in
    /// progress.
    pub async fn tick(&self) -> TickReport {
        let Ok(_guard) = self.guard.try_lock() else {
            tracing::warn!("Previous dispatch still running, skipping tick");
            return TickReport {
                overlapped: true,
                ..Default::default()
            };
        };

        let mut report = TickReport::default();

        let orders = match self.source.list_unprinted().await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch unprinted orders");
                return report;
            }
        };
        report.fetched = orders.len();
        if orders.is_empty() {
            return report;
        }
        tracing::debug!(count = orders.len(), "Fetched unprinted orders");

        for order in &orders {
            match self.dispatch(order).await {
                Dispatch::Printed => report.printed += 1,
                Dispatch::AlreadyProcessed => report.already_processed += 1,
                Dispatch::Failed => report.failed += 1,
            }
        }

        tracing::info!(
            fetched = report.fetched,
            printed = report.printed,
            already_processed = report.already_processed,
            failed = report.failed,
            "Dispatch tick finished"
        );
        report
    }

    async fn dispatch(&self, order: &Order) -> Dispatch {
        match self.ledger.is_processed(&order.id) {
            Ok(true) => {
                tracing::debug!(order_id = %order.id, "Order already printed, acknowledging");
                self.acknowledge(&order.id).await;
                return Dispatch::AlreadyProcessed;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "Ledger lookup failed, skipping order");
                return Dispatch::Failed;
            }
        }

        let data = self.renderer.render(order);
        if let Err(e) = self.printer.print(&data).await {
            tracing::error!(
                order_id = %order.id,
                table = %order.table,
                error = %e,
                "Failed to print order, will retry"
            );
            return Dispatch::Failed;
        }

        tracing::info!(order_id = %order.id, table = %order.table, "Order printed");

        if let Err(e) = self.ledger.mark_processed(&order.id) {
            tracing::error!(order_id = %order.id, error = %e, "Failed to record printed order in ledger");
        }
        self.acknowledge(&order.id).await;

        Dispatch::Printed
    }

    async fn acknowledge(&self, order_id: &str) {
        if let Err(e) = self.source.mark_printed(order_id).await {
            tracing::warn!(order_id = %order_id, error = %e, "Failed to mark order as printed");
        }
    }

    /// Tick now and then every `interval` until `shutdown` fires
    ///
    /// Cancellation abandons an in-flight tick; the interrupted order stays
    /// unprinted and is picked up again on the next start.
    pub async fn run(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        tracing::info!(interval_ms = interval.as_millis() as u64, "Dispatcher started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Dispatcher received shutdown signal");
                    break;
                }
                _ = async {
                    ticker.tick().await;
                    self.tick().await
                } => {}
            }
        }
    }
}
