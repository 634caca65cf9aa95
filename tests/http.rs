//! HTTP transport integration tests.
//!
//! Starts an axum server on an ephemeral port and exercises it with reqwest.

#![cfg(feature = "http")]

mod support;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use stock_ledger::{
    http, InMemoryAuditLog, InMemoryCatalog, InMemoryLedger, InMemorySalesHistory,
    InMemoryStockStore, Ledger, LedgerConfig, StockRecord, StockStore, StoreError, Versioned,
};
use support::{add_product, seeded};

async fn start_server(fixture: &InMemoryLedger) -> String {
    serve_ledger(fixture.ledger.clone()).await
}

/// Bind to port 0 and return the base URL.
async fn serve_ledger(ledger: Ledger) -> String {
    let app = http::router(ledger);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_check() {
    let base = start_server(&seeded(&[])).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn adjust_records_actor_from_header() {
    let fixture = seeded(&[("mug", 10)]);
    let base = start_server(&fixture).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/adjust"))
        .header(http::ACTOR_HEADER, "staff-7")
        .json(&json!({ "variantId": "mug", "quantity": 4, "mode": "subtract", "reason": "sold" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "previous": 10, "new": 6 }));

    let resp = client
        .get(format!("{base}/stock/mug/history?limit=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let history: Value = resp.json().await.unwrap();
    assert_eq!(history[0]["actor"], "staff-7");
    assert_eq!(history[0]["changeAmount"], -4);
    assert_eq!(history[0]["previousQuantity"], 10);
    assert_eq!(history[0]["newQuantity"], 6);
}

#[tokio::test]
async fn adjust_failures_map_to_status_codes() {
    let fixture = seeded(&[("mug", 1)]);
    let base = start_server(&fixture).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/adjust"))
        .json(&json!({ "variantId": "mug", "quantity": 5, "mode": "subtract", "reason": "damaged" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("enable backorders first"));

    let resp = client
        .post(format!("{base}/adjust"))
        .json(&json!({ "variantId": "ghost", "quantity": 1, "mode": "add", "reason": "restock" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("{base}/adjust"))
        .json(&json!({ "variantId": "mug", "quantity": 1, "mode": "add" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);

    let resp = client.get(format!("{base}/stock/ghost/history")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn bulk_reports_per_item_results() {
    let fixture = seeded(&[("a", 3), ("b", 3)]);
    let base = start_server(&fixture).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/adjust/bulk"))
        .json(&json!({ "adjustments": [
            { "variantId": "a", "quantity": 1, "mode": "subtract", "reason": "sold" },
            { "variantId": "b", "quantity": 9, "mode": "subtract", "reason": "sold" },
            { "variantId": "b", "quantity": 7, "mode": "set", "reason": "stocktake" },
        ] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][1]["success"], false);
    assert_eq!(body["results"][2]["data"]["new"], 7);
}

#[tokio::test]
async fn register_then_read_views() {
    let fixture = seeded(&[]);
    add_product(&fixture, "tea", "Green Tea", 800);
    let base = start_server(&fixture).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/stock/register"))
        .json(&json!({ "variantId": "tea", "sku": "TEA-01", "lowStockThreshold": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("{base}/stock/register"))
        .json(&json!({ "variantId": "tea" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    client
        .post(format!("{base}/adjust"))
        .json(&json!({ "variantId": "tea", "quantity": 2, "mode": "set", "reason": "initial count" }))
        .send()
        .await
        .unwrap();

    let view: Value = client
        .get(format!("{base}/stock/tea"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["name"], "Green Tea");
    assert_eq!(view["sku"], "TEA-01");
    assert_eq!(view["quantity"], 2);
    assert_eq!(view["status"], "low_stock");

    let low: Value = client
        .get(format!("{base}/stock/low"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(low[0]["variantId"], "tea");
    assert_eq!(low[0]["threshold"], 3);

    let page: Value = client
        .get(format!("{base}/stock?search=green&stockStatus=low_stock"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["perPage"], 20);

    let stats: Value = client
        .get(format!("{base}/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalItems"], 1);
    assert_eq!(stats["lowStock"], 1);
}

#[tokio::test]
async fn settings_patch_enables_backorders() {
    let fixture = seeded(&[("pre", 0)]);
    let base = start_server(&fixture).await;
    let client = reqwest::Client::new();

    let resp = client
        .patch(format!("{base}/stock/pre/settings"))
        .json(&json!({ "allowBackorders": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let record: Value = resp.json().await.unwrap();
    assert_eq!(record["allowBackorders"], true);

    let resp = client
        .post(format!("{base}/adjust"))
        .json(&json!({ "variantId": "pre", "quantity": 2, "mode": "subtract", "reason": "preorder" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let forecast: Value = client
        .get(format!("{base}/stock/pre/forecast"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(forecast["currentStock"], -2);
    assert_eq!(forecast["lowConfidence"], true);
}

/// Answers every read after a fixed delay.
struct SlowStore {
    inner: InMemoryStockStore,
    delay: Duration,
}

impl StockStore for SlowStore {
    fn get(&self, id: &str) -> Result<Option<Versioned<StockRecord>>, StoreError> {
        thread::sleep(self.delay);
        self.inner.get(id)
    }
    fn insert(&self, record: &StockRecord) -> Result<Versioned<StockRecord>, StoreError> {
        self.inner.insert(record)
    }
    fn update(
        &self,
        record: &StockRecord,
        expected_version: u64,
    ) -> Result<Versioned<StockRecord>, StoreError> {
        self.inner.update(record, expected_version)
    }
    fn find(
        &self,
        predicate: &dyn Fn(&StockRecord) -> bool,
    ) -> Result<Vec<Versioned<StockRecord>>, StoreError> {
        self.inner.find(predicate)
    }
}

#[tokio::test]
async fn slow_adjustment_times_out_with_504() {
    let inner = InMemoryStockStore::new();
    inner
        .insert(&StockRecord::new("mug").with_quantity(5).unwrap())
        .unwrap();
    let store = Arc::new(SlowStore {
        inner: inner.clone(),
        delay: Duration::from_millis(300),
    });
    let config = LedgerConfig {
        adjust_timeout_ms: 20,
        ..LedgerConfig::default()
    };
    let ledger = Ledger::new(
        config,
        store,
        Arc::new(InMemoryAuditLog::new()),
        Arc::new(InMemoryCatalog::new()),
        Arc::new(InMemorySalesHistory::new()),
    );
    let base = serve_ledger(ledger).await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/adjust"))
        .json(&json!({ "variantId": "mug", "quantity": 1, "mode": "add", "reason": "restock" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 504);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("outcome unknown"));

    // The expired deadline stops the write even though the blocking task kept running.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(inner.get("mug").unwrap().unwrap().data.quantity, 5);
}

