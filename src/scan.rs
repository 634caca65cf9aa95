//! Low-stock scanner - derives alert sets from the current ledger snapshot.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{display_name, Catalog};
use crate::error::LedgerError;
use crate::record::{StockRecord, StockStatus};
use crate::store::StockStore;

/// Snapshot view of a tracked record that needs attention. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlert {
    pub variant_id: String,
    pub sku: Option<String>,
    pub name: String,
    pub current_stock: i64,
    pub threshold: i64,
}

#[derive(Clone)]
pub struct LowStockScanner {
    store: Arc<dyn StockStore>,
    catalog: Arc<dyn Catalog>,
}

impl LowStockScanner {
    pub fn new(store: Arc<dyn StockStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self { store, catalog }
    }

    /// Tracked items with `0 < quantity <= threshold`, lowest stock first.
    pub fn scan_low_stock(&self) -> Result<Vec<LowStockAlert>, LedgerError> {
        self.scan(StockStatus::LowStock)
    }

    /// Tracked items with `quantity <= 0`, lowest stock first.
    pub fn scan_out_of_stock(&self) -> Result<Vec<LowStockAlert>, LedgerError> {
        self.scan(StockStatus::OutOfStock)
    }

    fn scan(&self, status: StockStatus) -> Result<Vec<LowStockAlert>, LedgerError> {
        let records = self
            .store
            .find(&|record: &StockRecord| record.track_quantity && record.status() == status)?;

        let mut alerts: Vec<LowStockAlert> = records
            .into_iter()
            .map(|versioned| {
                let record = versioned.data;
                LowStockAlert {
                    name: display_name(self.catalog.as_ref(), &record.variant_id),
                    current_stock: record.quantity,
                    threshold: record.low_stock_threshold,
                    sku: record.sku,
                    variant_id: record.variant_id,
                }
            })
            .collect();

        alerts.sort_by(|a, b| {
            a.current_stock
                .cmp(&b.current_stock)
                .then_with(|| a.variant_id.cmp(&b.variant_id))
        });
        Ok(alerts)
    }
}
