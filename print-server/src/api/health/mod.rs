//! Health check route
//!
//! | Path | Method | Purpose |
//! |------|--------|---------|
//! | /health | GET | process, store, ledger and printer status |
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "uptimeSeconds": 3600,
//!   "orders": { "total": 12, "unprinted": 0 },
//!   "ledgerSize": 57,
//!   "printer": { "address": "192.168.1.19:9100", "online": true }
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use station_printer::Printer;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// ok | degraded
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    orders: Option<OrderCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ledger_size: Option<u64>,
    printer: PrinterStatus,
}

#[derive(Debug, Serialize)]
pub struct OrderCounts {
    total: u64,
    unprinted: u64,
}

#[derive(Debug, Serialize)]
pub struct PrinterStatus {
    address: String,
    online: bool,
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let orders = match state.store.stats() {
        Ok(stats) => Some(OrderCounts {
            total: stats.total,
            unprinted: stats.unprinted,
        }),
        Err(e) => {
            tracing::error!(error = %e, "Health check: order store unavailable");
            None
        }
    };

    let ledger_size = state.ledger.as_ref().and_then(|ledger| match ledger.len() {
        Ok(len) => Some(len),
        Err(e) => {
            tracing::error!(error = %e, "Health check: ledger unavailable");
            None
        }
    });

    let printer = PrinterStatus {
        address: state.printer.addr(),
        online: state.printer.is_online().await,
    };

    Json(HealthResponse {
        status: if orders.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        orders,
        ledger_size,
        printer,
    })
}
