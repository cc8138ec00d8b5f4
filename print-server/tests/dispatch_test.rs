//! End-to-end dispatch against a fake TCP printer

use std::sync::{Arc, Mutex};
use std::time::Duration;

use print_server::{
    Config, DedupLedger, Dispatcher, HttpOrderFeed, OrderSource, OrderStore, ReceiptRenderer,
    ServerState, api::build_app,
};
use serde_json::json;
use station_printer::{Charset, NetworkPrinter};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

const CUT: &[u8] = &[0x1D, 0x56, 0x42, 0x00];

/// Accepts print jobs on a local port and keeps every payload
struct FakePrinter {
    port: u16,
    jobs: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakePrinter {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let jobs = Arc::new(Mutex::new(Vec::new()));

        let sink = jobs.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let sink = sink.clone();
                tokio::spawn(async move {
                    let mut data = Vec::new();
                    if socket.read_to_end(&mut data).await.is_ok() && !data.is_empty() {
                        sink.lock().unwrap().push(data);
                    }
                });
            }
        });

        Self { port, jobs }
    }

    fn client(&self) -> Arc<NetworkPrinter> {
        Arc::new(
            NetworkPrinter::new("127.0.0.1", self.port)
                .unwrap()
                .with_timeout(Duration::from_secs(2))
                .with_settle_delay(Duration::from_millis(10)),
        )
    }

    /// Wait until `count` jobs have been fully received
    async fn wait_for_jobs(&self, count: usize) -> Vec<Vec<u8>> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let jobs = self.jobs.lock().unwrap().clone();
                if jobs.len() >= count {
                    return jobs;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap()
    }
}

fn renderer() -> ReceiptRenderer {
    ReceiptRenderer::new(chrono_tz::Europe::Amsterdam, Charset::Utf8)
}

fn cola_intake() -> shared::models::OrderIntake {
    serde_json::from_value(json!({
        "table": "5",
        "items": [{"name": "Cola", "price": "€2,75", "quantity": 2}],
        "total": 5.50
    }))
    .unwrap()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[tokio::test]
async fn test_order_is_printed_once_end_to_end() {
    let printer = FakePrinter::start().await;
    let store = OrderStore::open_in_memory(chrono::Duration::minutes(120)).unwrap();
    let ledger = DedupLedger::open_in_memory(1000).unwrap();

    let id = store.append(cola_intake()).unwrap();
    let unprinted = store.list_unprinted().unwrap();
    assert_eq!(unprinted.len(), 1);
    assert_eq!(unprinted[0].id, id);

    let dispatcher = Dispatcher::new(
        printer.client(),
        Arc::new(store.clone()),
        ledger.clone(),
        renderer(),
    );

    let report = dispatcher.tick().await;
    assert_eq!(report.printed, 1);
    assert_eq!(report.failed, 0);

    let jobs = printer.wait_for_jobs(1).await;
    let receipt = &jobs[0];
    assert!(contains(receipt, "TOTAAL: €5,50".as_bytes()));
    assert!(contains(receipt, format!("Order ID: {}", id).as_bytes()));
    assert!(receipt.ends_with(CUT));

    assert!(store.list_unprinted().unwrap().is_empty());
    assert!(ledger.is_processed(&id).unwrap());

    // Nothing left to print
    let report = dispatcher.tick().await;
    assert_eq!(report.fetched, 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(printer.jobs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ledger_survives_restart() {
    let printer = FakePrinter::start().await;
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("ledger.redb");

    let mut intake = cola_intake();
    intake.payment_id = Some("tr_restart".to_string());

    {
        let store = OrderStore::open_in_memory(chrono::Duration::minutes(120)).unwrap();
        store.append(intake.clone()).unwrap();
        let ledger = DedupLedger::open(&ledger_path, 1000).unwrap();
        let dispatcher = Dispatcher::new(printer.client(), Arc::new(store), ledger, renderer());
        assert_eq!(dispatcher.tick().await.printed, 1);
    }
    printer.wait_for_jobs(1).await;

    // A store that never saw the acknowledgement still lists the order
    let store = OrderStore::open_in_memory(chrono::Duration::minutes(120)).unwrap();
    store.append(intake).unwrap();
    let ledger = DedupLedger::open(&ledger_path, 1000).unwrap();
    assert!(ledger.is_processed("tr_restart").unwrap());

    let dispatcher = Dispatcher::new(printer.client(), Arc::new(store.clone()), ledger, renderer());
    let report = dispatcher.tick().await;
    assert_eq!(report.printed, 0);
    assert_eq!(report.already_processed, 1);
    assert!(store.list_unprinted().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(printer.jobs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_remote_feed_dispatch() {
    let printer = FakePrinter::start().await;

    // Order owner: serves the HTTP API
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_work_dir(dir.path());
    let store = OrderStore::open_in_memory(config.retention()).unwrap();
    let state = ServerState::with_store(config, store.clone()).unwrap();
    let api = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let api_addr = api.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(api, build_app(state)).await;
    });

    let id = store.append(cola_intake()).unwrap();

    // Second instance: dispatches from the owner's feed
    let feed = HttpOrderFeed::new(&format!("http://{}", api_addr), Duration::from_secs(5)).unwrap();
    let listed = feed.list_unprinted().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);

    let dispatcher = Dispatcher::new(
        printer.client(),
        Arc::new(feed),
        DedupLedger::open_in_memory(1000).unwrap(),
        renderer(),
    );
    let report = dispatcher.tick().await;
    assert_eq!(report.printed, 1);

    printer.wait_for_jobs(1).await;
    assert!(store.list_unprinted().unwrap().is_empty());
    assert!(store.get(&id).unwrap().unwrap().printed);
}
