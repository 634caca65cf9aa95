//! Stock records - one ledger row per sellable variant.
//!
//! `available_quantity` is derived. Every constructor and `with_*` method
//! recomputes it, so a `StockRecord` built through this API always satisfies
//! `available_quantity == quantity - reserved_quantity`.

mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

pub use status::{classify, StockStatus};

/// Threshold used when nothing else is configured.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// The persisted quantity state for one sellable variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub variant_id: String,
    pub sku: Option<String>,
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub available_quantity: i64,
    pub low_stock_threshold: i64,
    pub allow_backorders: bool,
    pub track_quantity: bool,
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Create an empty, tracked record with the default threshold.
    pub fn new(variant_id: impl Into<String>) -> Self {
        Self {
            variant_id: variant_id.into(),
            sku: None,
            quantity: 0,
            reserved_quantity: 0,
            available_quantity: 0,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            allow_backorders: false,
            track_quantity: true,
            updated_at: Utc::now(),
        }
    }

    /// Set the SKU.
    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    /// Copy with a new on-hand quantity. Fails if `available_quantity`
    /// would not fit in an `i64`.
    pub fn with_quantity(&self, quantity: i64) -> Result<Self, LedgerError> {
        let mut next = self.clone();
        next.quantity = quantity;
        next.touch()?;
        Ok(next)
    }

    /// Copy with a new reserved quantity.
    pub fn with_reserved(&self, reserved_quantity: i64) -> Result<Self, LedgerError> {
        let mut next = self.clone();
        next.reserved_quantity = reserved_quantity;
        next.touch()?;
        Ok(next)
    }

    /// Copy with the given settings applied. Fields left `None` are kept.
    pub fn with_settings(&self, settings: &StockSettings) -> Result<Self, LedgerError> {
        settings.validate()?;
        let mut next = self.clone();
        if let Some(threshold) = settings.low_stock_threshold {
            next.low_stock_threshold = threshold;
        }
        if let Some(allow) = settings.allow_backorders {
            next.allow_backorders = allow;
        }
        if let Some(track) = settings.track_quantity {
            next.track_quantity = track;
        }
        next.touch()?;
        Ok(next)
    }

    /// Status from quantity and threshold alone.
    pub fn status(&self) -> StockStatus {
        classify(self.quantity, self.low_stock_threshold)
    }

    /// Like `status`, but records that don't track quantity are always in stock.
    pub fn effective_status(&self) -> StockStatus {
        if self.track_quantity {
            self.status()
        } else {
            StockStatus::InStock
        }
    }

    /// True when the derived and guarded fields agree.
    pub fn is_consistent(&self) -> bool {
        self.quantity.checked_sub(self.reserved_quantity) == Some(self.available_quantity)
            && self.reserved_quantity >= 0
            && (self.quantity >= 0 || self.allow_backorders)
    }

    fn touch(&mut self) -> Result<(), LedgerError> {
        self.available_quantity = self
            .quantity
            .checked_sub(self.reserved_quantity)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "available stock of {} overflows ({} on hand, {} reserved)",
                    self.variant_id, self.quantity, self.reserved_quantity
                ))
            })?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial update of a record's stock settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSettings {
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub allow_backorders: Option<bool>,
    #[serde(default)]
    pub track_quantity: Option<bool>,
}

impl StockSettings {
    /// Only change the low-stock threshold.
    pub fn threshold(threshold: i64) -> Self {
        Self {
            low_stock_threshold: Some(threshold),
            ..Self::default()
        }
    }

    /// Only turn backorders on or off.
    pub fn backorders(allow: bool) -> Self {
        Self {
            allow_backorders: Some(allow),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        match self.low_stock_threshold {
            Some(threshold) if threshold < 0 => Err(LedgerError::Validation(format!(
                "low stock threshold must be >= 0, got {threshold}"
            ))),
            _ => Ok(()),
        }
    }
}

/// A versioned wrapper around stored data for optimistic concurrency control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}
