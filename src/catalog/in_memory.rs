use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::{Catalog, CatalogEntry, SalesHistory};
use crate::error::StoreError;

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    entries: Arc<RwLock<HashMap<String, CatalogEntry>>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for a variant.
    pub fn put(&self, variant_id: impl Into<String>, entry: CatalogEntry) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Storage("catalog lock poisoned".into()))?;
        entries.insert(variant_id.into(), entry);
        Ok(())
    }

    /// Drop a variant's entry. Returns whether one existed.
    pub fn remove(&self, variant_id: &str) -> Result<bool, StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Storage("catalog lock poisoned".into()))?;
        Ok(entries.remove(variant_id).is_some())
    }
}

impl Catalog for InMemoryCatalog {
    fn lookup(&self, variant_id: &str) -> Result<Option<CatalogEntry>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Storage("catalog lock poisoned".into()))?;
        Ok(entries.get(variant_id).cloned())
    }
}

struct Sale {
    quantity: u64,
    sold_at: DateTime<Utc>,
}

/// Completed sales recorded per variant.
#[derive(Clone, Default)]
pub struct InMemorySalesHistory {
    sales: Arc<RwLock<HashMap<String, Vec<Sale>>>>,
}

impl InMemorySalesHistory {
    /// Create a history with no sales.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed sale of `quantity` units.
    pub fn record_sale(
        &self,
        variant_id: impl Into<String>,
        quantity: u64,
        sold_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut sales = self
            .sales
            .write()
            .map_err(|_| StoreError::Storage("sales lock poisoned".into()))?;
        sales
            .entry(variant_id.into())
            .or_default()
            .push(Sale { quantity, sold_at });
        Ok(())
    }
}

impl SalesHistory for InMemorySalesHistory {
    fn units_sold(
        &self,
        variant_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let sales = self
            .sales
            .read()
            .map_err(|_| StoreError::Storage("sales lock poisoned".into()))?;
        Ok(sales
            .get(variant_id)
            .map(|lines| {
                lines
                    .iter()
                    .filter(|sale| sale.sold_at >= since && sale.sold_at < until)
                    .fold(0u64, |total, sale| total.saturating_add(sale.quantity))
            })
            .unwrap_or(0))
    }

    fn first_sale_at(&self, variant_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let sales = self
            .sales
            .read()
            .map_err(|_| StoreError::Storage("sales lock poisoned".into()))?;
        Ok(sales
            .get(variant_id)
            .and_then(|lines| lines.iter().map(|sale| sale.sold_at).min()))
    }
}
