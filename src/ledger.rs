//! Ledger - one handle wiring the store, audit log and collaborators to
//! every ledger operation.
//!
//! ## Example
//!
//! ```ignore
//! use stock_ledger::{AdjustmentRequest, Ledger, StockSettings};
//!
//! let ledger = Ledger::in_memory();
//! ledger.register("variant-1", Some("MUG-BLUE".into()), &StockSettings::default())?;
//! ledger.adjust(&AdjustmentRequest::add("variant-1", 40, "initial count"))?;
//!
//! let low = ledger.scan_low_stock()?;
//! let stats = ledger.stats()?;
//! ```

use std::sync::Arc;

use crate::adjust::{
    AdjustOptions, AdjustmentEngine, AdjustmentOutcome, AdjustmentRequest, BulkCoordinator,
    BulkResult,
};
use crate::audit::{AuditEntry, AuditLog, InMemoryAuditLog};
use crate::catalog::{Catalog, InMemoryCatalog, InMemorySalesHistory, SalesHistory};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::forecast::{ForecastCalculator, ForecastParams, StockForecast};
use crate::query::{Page, StockQueries, StockQuery, StockView};
use crate::record::{StockRecord, StockSettings};
use crate::scan::{LowStockAlert, LowStockScanner};
use crate::stats::{InventoryStats, StatsAggregator};
use crate::store::{InMemoryStockStore, StockStore};

/// Clone-friendly: every component shares the same `Arc`ed backends.
#[derive(Clone)]
pub struct Ledger {
    config: LedgerConfig,
    engine: AdjustmentEngine,
    bulk: BulkCoordinator,
    scanner: LowStockScanner,
    forecasts: ForecastCalculator,
    stats: StatsAggregator,
    queries: StockQueries,
}

impl Ledger {
    pub fn new(
        config: LedgerConfig,
        store: Arc<dyn StockStore>,
        audit: Arc<dyn AuditLog>,
        catalog: Arc<dyn Catalog>,
        sales: Arc<dyn SalesHistory>,
    ) -> Self {
        let engine = AdjustmentEngine::new(store.clone(), audit)
            .with_conflict_retries(config.max_conflict_retries)
            .with_default_threshold(config.default_low_stock_threshold);
        let bulk = BulkCoordinator::new(engine.clone()).with_parallelism(config.bulk_parallelism);

        Self {
            scanner: LowStockScanner::new(store.clone(), catalog.clone()),
            forecasts: ForecastCalculator::new(store.clone(), catalog.clone(), sales)
                .with_params(ForecastParams::from(&config)),
            stats: StatsAggregator::new(store.clone(), catalog.clone()),
            queries: StockQueries::new(store, catalog),
            engine,
            bulk,
            config,
        }
    }

    /// Ledger over fresh in-memory backends with default config.
    pub fn in_memory() -> Self {
        InMemoryLedger::new(LedgerConfig::default()).ledger
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn register(
        &self,
        variant_id: &str,
        sku: Option<String>,
        settings: &StockSettings,
    ) -> Result<StockRecord, LedgerError> {
        self.engine.register(variant_id, sku, settings)
    }

    pub fn adjust(&self, request: &AdjustmentRequest) -> Result<AdjustmentOutcome, LedgerError> {
        self.engine.adjust(request)
    }

    pub fn adjust_with(
        &self,
        request: &AdjustmentRequest,
        opts: AdjustOptions,
    ) -> Result<AdjustmentOutcome, LedgerError> {
        self.engine.adjust_with(request, opts)
    }

    pub fn adjust_bulk(&self, adjustments: &[AdjustmentRequest]) -> BulkResult {
        self.bulk.adjust_bulk(adjustments)
    }

    pub fn adjust_bulk_with(
        &self,
        adjustments: &[AdjustmentRequest],
        opts: AdjustOptions,
    ) -> BulkResult {
        self.bulk.adjust_bulk_with(adjustments, opts)
    }

    pub fn reserve(&self, variant_id: &str, quantity: i64) -> Result<StockRecord, LedgerError> {
        self.engine.reserve(variant_id, quantity)
    }

    pub fn release(&self, variant_id: &str, quantity: i64) -> Result<StockRecord, LedgerError> {
        self.engine.release(variant_id, quantity)
    }

    pub fn update_settings(
        &self,
        variant_id: &str,
        settings: &StockSettings,
    ) -> Result<StockRecord, LedgerError> {
        self.engine.update_settings(variant_id, settings)
    }

    pub fn record(&self, variant_id: &str) -> Result<StockRecord, LedgerError> {
        self.engine
            .store()
            .get(variant_id)?
            .map(|versioned| versioned.data)
            .ok_or_else(|| LedgerError::NotFound(variant_id.to_string()))
    }

    pub fn history(
        &self,
        variant_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEntry>, LedgerError> {
        Ok(self.engine.audit().for_variant(variant_id, limit)?)
    }

    pub fn view(&self, variant_id: &str) -> Result<StockView, LedgerError> {
        self.queries.get(variant_id)
    }

    pub fn list(&self, query: &StockQuery) -> Result<Page<StockView>, LedgerError> {
        self.queries.list(query)
    }

    pub fn scan_low_stock(&self) -> Result<Vec<LowStockAlert>, LedgerError> {
        self.scanner.scan_low_stock()
    }

    pub fn scan_out_of_stock(&self) -> Result<Vec<LowStockAlert>, LedgerError> {
        self.scanner.scan_out_of_stock()
    }

    pub fn forecast(&self, variant_id: &str) -> Result<StockForecast, LedgerError> {
        self.forecasts.forecast(variant_id)
    }

    pub fn forecast_low_stock(&self) -> Result<Vec<StockForecast>, LedgerError> {
        self.forecasts.forecast_low_stock()
    }

    pub fn stats(&self) -> Result<InventoryStats, LedgerError> {
        self.stats.get_stats()
    }
}

/// A ledger plus direct handles on its in-memory backends, for seeding the
/// catalog and sales history in tests and local runs.
#[derive(Clone)]
pub struct InMemoryLedger {
    pub ledger: Ledger,
    pub store: InMemoryStockStore,
    pub audit: InMemoryAuditLog,
    pub catalog: InMemoryCatalog,
    pub sales: InMemorySalesHistory,
}

impl InMemoryLedger {
    pub fn new(config: LedgerConfig) -> Self {
        let store = InMemoryStockStore::new();
        let audit = InMemoryAuditLog::new();
        let catalog = InMemoryCatalog::new();
        let sales = InMemorySalesHistory::new();
        let ledger = Ledger::new(
            config,
            Arc::new(store.clone()),
            Arc::new(audit.clone()),
            Arc::new(catalog.clone()),
            Arc::new(sales.clone()),
        );
        Self {
            ledger,
            store,
            audit,
            catalog,
            sales,
        }
    }
}
