//! # stock_ledger
//!
//! Inventory stock ledger: one quantity row per sellable variant, atomic
//! adjustments guarded against negative stock, an append-only audit log,
//! low-stock scanning, store-wide stats and sales-velocity forecasting.
//!
//! Storage and collaborators sit behind traits (`StockStore`, `AuditLog`,
//! `Catalog`, `SalesHistory`) with in-memory implementations included.

mod adjust;
mod audit;
mod catalog;
mod config;
mod error;
mod forecast;
mod ledger;
mod query;
mod record;
mod scan;
mod stats;
mod store;

#[cfg(feature = "http")]
pub mod http;

pub use adjust::{
    AdjustOptions, AdjustResponse, AdjustmentEngine, AdjustmentMode, AdjustmentOutcome,
    AdjustmentRequest, BulkCoordinator, BulkRequest, BulkResult, ItemResult,
};
pub use audit::{AuditEntry, AuditLog, InMemoryAuditLog};
pub use catalog::{
    Catalog, CatalogEntry, InMemoryCatalog, InMemorySalesHistory, SalesHistory, UNKNOWN_PRODUCT,
};
pub use config::LedgerConfig;
pub use error::{LedgerError, StoreError};
pub use forecast::{project, ForecastCalculator, ForecastParams, Projection, StockForecast};
pub use ledger::{InMemoryLedger, Ledger};
pub use query::{Page, StockQueries, StockQuery, StockStatusFilter, StockView};
pub use record::{classify, StockRecord, StockSettings, StockStatus, Versioned};
pub use scan::{LowStockAlert, LowStockScanner};
pub use stats::{InventoryStats, StatsAggregator};
pub use store::{InMemoryStockStore, StockStore};
