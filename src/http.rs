//! HTTP transport for the ledger.
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /adjust` - one adjustment, `{ variantId, quantity, mode, reason }`.
//! - `POST /adjust/bulk` - `{ adjustments: [...] }`, per-item results.
//! - `POST /stock/register` - create the ledger row for a catalog variant.
//! - `GET /stock` - paginated listing, `?search=&stockStatus=&page=&perPage=`.
//! - `GET /stock/low`, `GET /stock/out` - alert buckets.
//! - `GET /stock/:variant_id` - one record with its catalog join.
//! - `PATCH /stock/:variant_id/settings` - threshold / backorders / tracking.
//! - `GET /stock/:variant_id/history` - audit entries, newest first.
//! - `GET /stock/:variant_id/forecast` - depletion forecast.
//! - `GET /stats`, `GET /health`.
//!
//! The acting user comes from the `x-actor-id` header.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::adjust::{AdjustOptions, AdjustResponse, AdjustmentRequest, BulkRequest};
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::query::StockQuery;
use crate::record::StockSettings;

pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub variant_id: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(flatten)]
    pub settings: StockSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Build an axum `Router` serving the given ledger.
pub fn router(ledger: Ledger) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/adjust", post(adjust_handler))
        .route("/adjust/bulk", post(bulk_handler))
        .route("/stock", get(list_handler))
        .route("/stock/register", post(register_handler))
        .route("/stock/low", get(low_stock_handler))
        .route("/stock/out", get(out_of_stock_handler))
        .route("/stock/:variant_id", get(record_handler))
        .route("/stock/:variant_id/settings", patch(settings_handler))
        .route("/stock/:variant_id/history", get(history_handler))
        .route("/stock/:variant_id/forecast", get(forecast_handler))
        .route("/stats", get(stats_handler))
        .with_state(ledger)
}

/// Serve the ledger over HTTP at the given address (e.g. `"0.0.0.0:3000"`).
pub async fn serve(ledger: Ledger, addr: &str) -> Result<(), std::io::Error> {
    let app = router(ledger);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr, "stock ledger listening");
    axum::serve(listener, app).await
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// `POST /adjust` - runs on the blocking pool, bounded by the configured timeout.
async fn adjust_handler(
    State(ledger): State<Ledger>,
    headers: HeaderMap,
    Json(mut request): Json<AdjustmentRequest>,
) -> Response {
    if request.actor.is_none() {
        request.actor = actor_from_headers(&headers);
    }
    let timeout = ledger.config().adjust_timeout();
    let variant_id = request.variant_id.clone();

    let task = tokio::task::spawn_blocking(move || {
        ledger.adjust_with(&request, AdjustOptions::timeout(timeout))
    });
    let result = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(LedgerError::Storage(join_err.to_string())),
        Err(_) => Err(LedgerError::Timeout(variant_id)),
    };

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(err) => status_of(err),
    };
    (status, Json(AdjustResponse::from(&result))).into_response()
}

/// `POST /adjust/bulk` - always 200; failures are reported per item.
async fn bulk_handler(
    State(ledger): State<Ledger>,
    headers: HeaderMap,
    Json(mut request): Json<BulkRequest>,
) -> Response {
    if let Some(actor) = actor_from_headers(&headers) {
        for item in request.adjustments.iter_mut().filter(|i| i.actor.is_none()) {
            item.actor = Some(actor.clone());
        }
    }
    let opts = AdjustOptions::timeout(ledger.config().adjust_timeout());

    let task = tokio::task::spawn_blocking(move || {
        ledger.adjust_bulk_with(&request.adjustments, opts)
    });
    match task.await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(join_err) => error_response(LedgerError::Storage(join_err.to_string())),
    }
}

async fn register_handler(
    State(ledger): State<Ledger>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    match ledger.register(&request.variant_id, request.sku, &request.settings) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_handler(State(ledger): State<Ledger>, Query(query): Query<StockQuery>) -> Response {
    respond(ledger.list(&query))
}

async fn low_stock_handler(State(ledger): State<Ledger>) -> Response {
    respond(ledger.scan_low_stock())
}

async fn out_of_stock_handler(State(ledger): State<Ledger>) -> Response {
    respond(ledger.scan_out_of_stock())
}

async fn record_handler(State(ledger): State<Ledger>, Path(variant_id): Path<String>) -> Response {
    respond(ledger.view(&variant_id))
}

async fn settings_handler(
    State(ledger): State<Ledger>,
    Path(variant_id): Path<String>,
    Json(settings): Json<StockSettings>,
) -> Response {
    respond(ledger.update_settings(&variant_id, &settings))
}

async fn history_handler(
    State(ledger): State<Ledger>,
    Path(variant_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Response {
    // A variant with no entries yet still has to exist.
    if let Err(err) = ledger.record(&variant_id) {
        return error_response(err);
    }
    respond(ledger.history(&variant_id, params.limit))
}

async fn forecast_handler(
    State(ledger): State<Ledger>,
    Path(variant_id): Path<String>,
) -> Response {
    respond(ledger.forecast(&variant_id))
}

async fn stats_handler(State(ledger): State<Ledger>) -> Response {
    respond(ledger.stats())
}

fn respond<T: Serialize>(result: Result<T, LedgerError>) -> Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: LedgerError) -> Response {
    let body = json!({ "error": err.user_message() });
    (status_of(&err), Json(body)).into_response()
}

fn status_of(err: &LedgerError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn actor_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
