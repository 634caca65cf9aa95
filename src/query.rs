//! Paginated stock listing with search and status filters.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, UNKNOWN_PRODUCT};
use crate::error::LedgerError;
use crate::record::{StockRecord, StockStatus};
use crate::store::StockStore;

pub const DEFAULT_PER_PAGE: usize = 20;
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatusFilter {
    #[default]
    All,
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatusFilter {
    pub fn matches(self, status: StockStatus) -> bool {
        match self {
            StockStatusFilter::All => true,
            StockStatusFilter::InStock => status == StockStatus::InStock,
            StockStatusFilter::LowStock => status == StockStatus::LowStock,
            StockStatusFilter::OutOfStock => status == StockStatus::OutOfStock,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, alias = "stock_status")]
    pub stock_status: StockStatusFilter,
    /// 1-based.
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default, alias = "per_page")]
    pub per_page: Option<usize>,
}

/// A record joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    #[serde(flatten)]
    pub record: StockRecord,
    pub name: String,
    pub price: Option<Decimal>,
    pub status: StockStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

#[derive(Clone)]
pub struct StockQueries {
    store: Arc<dyn StockStore>,
    catalog: Arc<dyn Catalog>,
}

impl StockQueries {
    pub fn new(store: Arc<dyn StockStore>, catalog: Arc<dyn Catalog>) -> Self {
        Self { store, catalog }
    }

    pub fn get(&self, variant_id: &str) -> Result<StockView, LedgerError> {
        let record = self
            .store
            .get(variant_id)?
            .ok_or_else(|| LedgerError::NotFound(variant_id.to_string()))?
            .data;
        Ok(self.view(record))
    }

    pub fn list(&self, query: &StockQuery) -> Result<Page<StockView>, LedgerError> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let filter = query.stock_status;
        let records = self
            .store
            .find(&|record: &StockRecord| filter.matches(record.effective_status()))?;

        let matching: Vec<StockView> = records
            .into_iter()
            .map(|versioned| self.view(versioned.data))
            .filter(|view| match &needle {
                Some(needle) => matches_search(view, needle),
                None => true,
            })
            .collect();

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();

        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    fn view(&self, record: StockRecord) -> StockView {
        let entry = match self.catalog.lookup(&record.variant_id) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(variant_id = %record.variant_id, error = %err, "catalog lookup failed");
                None
            }
        };
        let mut record = record;
        if record.sku.is_none() {
            record.sku = entry.as_ref().and_then(|e| e.sku.clone());
        }
        StockView {
            status: record.effective_status(),
            name: entry
                .as_ref()
                .map(|e| e.name.clone())
                .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
            price: entry.map(|e| e.price),
            record,
        }
    }
}

fn matches_search(view: &StockView, needle: &str) -> bool {
    view.record.variant_id.to_lowercase().contains(needle)
        || view.name.to_lowercase().contains(needle)
        || view
            .record
            .sku
            .as_deref()
            .is_some_and(|sku| sku.to_lowercase().contains(needle))
}
