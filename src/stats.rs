//! Store-wide totals for dashboards. Read-only.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::LedgerError;
use crate::record::StockStatus;
use crate::store::StockStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_items: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub total_value: Decimal,
}

#[derive(Clone)]
pub struct StatsAggregator {
    store: Arc<dyn StockStore>,
    catalog: Arc<dyn Catalog>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn StockStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self { store, catalog }
    }

    /// One pass over every record. Untracked records count as in stock;
    /// records without a catalog entry, and backordered units, add no value.
    /// A total beyond the `Decimal` range is a `Validation` error.
    pub fn get_stats(&self) -> Result<InventoryStats, LedgerError> {
        let mut stats = InventoryStats::default();

        for versioned in self.store.list()? {
            let record = versioned.data;
            stats.total_items += 1;
            match record.effective_status() {
                StockStatus::InStock => stats.in_stock += 1,
                StockStatus::LowStock => stats.low_stock += 1,
                StockStatus::OutOfStock => stats.out_of_stock += 1,
            }

            if record.quantity <= 0 {
                continue;
            }
            match self.catalog.lookup(&record.variant_id) {
                Ok(Some(entry)) => {
                    stats.total_value = entry
                        .unit_value()
                        .checked_mul(Decimal::from(record.quantity))
                        .and_then(|line| stats.total_value.checked_add(line))
                        .ok_or_else(|| {
                            LedgerError::Validation(format!(
                                "inventory value overflows at {}",
                                record.variant_id
                            ))
                        })?;
                }
                Ok(None) => {
                    tracing::debug!(variant_id = %record.variant_id, "no catalog entry, valued at zero");
                }
                Err(err) => {
                    tracing::warn!(variant_id = %record.variant_id, error = %err, "catalog lookup failed");
                }
            }
        }

        Ok(stats)
    }
}
