//! HTTP API tests driving the router in-process

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use print_server::{Config, HttpOrderFeed, OrderStore, ServerState, api::build_app};
use std::time::Duration;
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: axum::Router,
    store: OrderStore,
    _dir: tempfile::TempDir,
}

fn app_with_printer(host: &str, port: u16) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_work_dir(dir.path());
    config.printer_host = host.to_string();
    config.printer_port = port;
    config.printer_timeout_ms = 500;

    let store = OrderStore::open_in_memory(config.retention()).unwrap();
    let state = ServerState::with_store(config, store.clone()).unwrap();

    TestApp {
        router: build_app(state),
        store,
        _dir: dir,
    }
}

fn app() -> TestApp {
    app_with_printer("127.0.0.1", 9100)
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn cola_order() -> Value {
    json!({
        "table": "5",
        "items": [{"name": "Cola", "price": "€2,75", "quantity": 2}],
        "total": 5.50,
        "comment": "Met ijs"
    })
}

#[tokio::test]
async fn test_create_list_and_mark() {
    let app = app();

    let (status, body) = send(&app, "POST", "/orders", Some(cola_order())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let order_id = body["orderId"].as_str().unwrap().to_string();
    assert!(order_id.starts_with("order_"));

    let (status, body) = send(&app, "GET", "/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], order_id.as_str());
    assert_eq!(orders[0]["table"], "5");
    assert_eq!(orders[0]["printed"], false);
    assert_eq!(orders[0]["comment"], "Met ijs");
    assert_eq!(orders[0]["items"][0]["price"], "€2,75");

    let (status, body) = send(
        &app,
        "POST",
        "/orders/mark-printed",
        Some(json!({"orderId": order_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    // Idempotent
    let (status, _) = send(
        &app,
        "POST",
        "/orders/mark-printed",
        Some(json!({"orderId": order_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/orders", None).await;
    assert_eq!(body, json!([]));
    assert!(app.store.get(&order_id).unwrap().unwrap().printed);
}

#[tokio::test]
async fn test_payment_id_is_used_and_deduplicated() {
    let app = app();
    let mut order = cola_order();
    order["paymentId"] = json!("tr_WDqYK6vllg");

    let (_, first) = send(&app, "POST", "/orders", Some(order.clone())).await;
    let (_, second) = send(&app, "POST", "/orders", Some(order)).await;
    assert_eq!(first["orderId"], "tr_WDqYK6vllg");
    assert_eq!(second["orderId"], "tr_WDqYK6vllg");

    let (_, body) = send(&app, "GET", "/orders", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_numeric_table_is_accepted() {
    let app = app();
    let mut order = cola_order();
    order["table"] = json!(12);

    let (status, _) = send(&app, "POST", "/orders", Some(order)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/orders", None).await;
    assert_eq!(body[0]["table"], "12");
}

#[tokio::test]
async fn test_validation_errors_are_400_and_not_stored() {
    let app = app();

    let cases = [
        (json!({"table": "5", "items": [], "total": 5.5}), 4002),
        (
            json!({"table": "", "items": [{"name": "Cola", "price": "€2,75", "quantity": 1}], "total": 2.75}),
            4003,
        ),
        (
            json!({"table": "5", "items": [{"name": "Cola", "price": "€2,75", "quantity": 1}], "total": 0}),
            4004,
        ),
        (
            json!({"table": "5", "items": [{"name": "Cola", "price": "€2,75", "quantity": 0}], "total": 2.75}),
            4102,
        ),
        (
            json!({"table": "5", "items": [{"name": "Cola", "price": "gratis", "quantity": 1}], "total": 2.75}),
            4103,
        ),
    ];

    for (body, code) in cases {
        let (status, resp) = send(&app, "POST", "/orders", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["success"], false);
        assert_eq!(resp["code"], code);
        assert!(resp["error"].is_string());
    }

    assert_eq!(app.store.stats().unwrap().total, 0);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 4);
}

#[tokio::test]
async fn test_mark_unknown_order_is_404() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/orders/mark-printed",
        Some(json!({"orderId": "order_0_missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 4001);
}

#[tokio::test]
async fn test_health_reports_store_and_printer() {
    let printer = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = printer.local_addr().unwrap().port();
    let app = app_with_printer("127.0.0.1", port);

    send(&app, "POST", "/orders", Some(cola_order())).await;

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], json!({"total": 1, "unprinted": 1}));
    assert_eq!(body["printer"]["address"], format!("127.0.0.1:{}", port));
    assert_eq!(body["printer"]["online"], true);
    assert!(body.get("ledgerSize").is_none());
}

/// Instance whose order routes forward to `feed_base`, with its own (unused) local store
fn forwarding_app(feed_base: &str) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_work_dir(dir.path());
    let store = OrderStore::open_in_memory(config.retention()).unwrap();
    let feed = HttpOrderFeed::new(feed_base, Duration::from_secs(2)).unwrap();
    let state = ServerState::with_store(config, store.clone())
        .unwrap()
        .with_feed(feed);

    TestApp {
        router: build_app(state),
        store,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_feed_instance_forwards_orders_to_owner() {
    let owner = app();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let owner_addr = listener.local_addr().unwrap();
    let owner_router = owner.router.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, owner_router).await;
    });

    let edge = forwarding_app(&format!("http://{}", owner_addr));

    let (status, body) = send(&edge, "POST", "/orders", Some(cola_order())).await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["orderId"].as_str().unwrap().to_string();

    // Stored where the dispatcher reads, not locally
    assert!(owner.store.get(&order_id).unwrap().is_some());
    assert_eq!(edge.store.stats().unwrap().total, 0);

    let (_, listed) = send(&edge, "GET", "/orders", None).await;
    assert_eq!(listed[0]["id"], order_id.as_str());

    let (status, _) = send(
        &edge,
        "POST",
        "/orders/mark-printed",
        Some(json!({"orderId": order_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(owner.store.get(&order_id).unwrap().unwrap().printed);

    let (status, body) = send(
        &edge,
        "POST",
        "/orders/mark-printed",
        Some(json!({"orderId": "order_0_missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);

    // Validation still answers locally
    let (status, body) = send(
        &edge,
        "POST",
        "/orders",
        Some(json!({"table": "5", "items": [], "total": 5.5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 4002);
}

#[tokio::test]
async fn test_unreachable_owner_is_not_acknowledged() {
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = closed.local_addr().unwrap();
    drop(closed);

    let edge = forwarding_app(&format!("http://{}", addr));

    let (status, body) = send(&edge, "POST", "/orders", Some(cola_order())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 9003);
    assert_eq!(edge.store.stats().unwrap().total, 0);
}
