//! Outbound collaborators: the product catalog and order history.
//!
//! Both are read-only from the ledger's side. The catalog owns variant
//! identity, names and prices; order history knows what was sold.

mod in_memory;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use in_memory::{InMemoryCatalog, InMemorySalesHistory};

/// Shown when a record has no catalog entry (e.g. deleted product).
pub const UNKNOWN_PRODUCT: &str = "Unknown product";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub cost: Option<Decimal>,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            sku: None,
            price,
            cost: None,
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Value of one unit on the shelf: cost when known, else price.
    pub fn unit_value(&self) -> Decimal {
        self.cost.unwrap_or(self.price)
    }
}

pub trait Catalog: Send + Sync {
    fn lookup(&self, variant_id: &str) -> Result<Option<CatalogEntry>, StoreError>;
}

/// Completed order line items, summed per variant.
pub trait SalesHistory: Send + Sync {
    /// Units sold in `[since, until)`.
    fn units_sold(
        &self,
        variant_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Time of the earliest completed sale, if any.
    fn first_sale_at(&self, variant_id: &str) -> Result<Option<DateTime<Utc>>, StoreError>;
}

/// Display name for a variant, falling back to a placeholder on any miss.
pub(crate) fn display_name(catalog: &dyn Catalog, variant_id: &str) -> String {
    match catalog.lookup(variant_id) {
        Ok(Some(entry)) => entry.name,
        Ok(None) => UNKNOWN_PRODUCT.to_string(),
        Err(err) => {
            tracing::warn!(variant_id, error = %err, "catalog lookup failed");
            UNKNOWN_PRODUCT.to_string()
        }
    }
}
