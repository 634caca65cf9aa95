//! Stock adjustments - single changes and bulk batches.
//!
//! ## Example
//!
//! ```ignore
//! use stock_ledger::{AdjustmentEngine, AdjustmentRequest, InMemoryAuditLog, InMemoryStockStore};
//!
//! let engine = AdjustmentEngine::new(store, audit);
//! let outcome = engine.adjust(&AdjustmentRequest::subtract("variant-1", 8, "sold"))?;
//! assert_eq!(outcome.new, outcome.previous - 8);
//! ```

mod bulk;
mod engine;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

pub use bulk::{BulkCoordinator, BulkRequest, BulkResult, ItemResult};
pub use engine::{AdjustOptions, AdjustmentEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentMode {
    Add,
    Subtract,
    Set,
}

impl AdjustmentMode {
    /// The quantity this mode produces from `current`. None on overflow.
    pub fn apply(self, current: i64, amount: i64) -> Option<i64> {
        match self {
            AdjustmentMode::Add => current.checked_add(amount),
            AdjustmentMode::Subtract => current.checked_sub(amount),
            AdjustmentMode::Set => Some(amount),
        }
    }
}

/// A requested change to one variant's on-hand quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    pub variant_id: String,
    pub quantity: i64,
    pub mode: AdjustmentMode,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub actor: Option<String>,
}

impl AdjustmentRequest {
    /// Create a request with no actor.
    pub fn new(
        variant_id: impl Into<String>,
        quantity: i64,
        mode: AdjustmentMode,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            variant_id: variant_id.into(),
            quantity,
            mode,
            reason: reason.into(),
            actor: None,
        }
    }

    /// Add `quantity` units, e.g. a restock.
    pub fn add(variant_id: impl Into<String>, quantity: i64, reason: impl Into<String>) -> Self {
        Self::new(variant_id, quantity, AdjustmentMode::Add, reason)
    }

    /// Remove `quantity` units, e.g. a sale or damage write-off.
    pub fn subtract(
        variant_id: impl Into<String>,
        quantity: i64,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(variant_id, quantity, AdjustmentMode::Subtract, reason)
    }

    /// Overwrite the on-hand quantity, e.g. after a stocktake.
    pub fn set(variant_id: impl Into<String>, quantity: i64, reason: impl Into<String>) -> Self {
        Self::new(variant_id, quantity, AdjustmentMode::Set, reason)
    }

    /// Attribute the adjustment to an actor.
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Input checks that need no stored state.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.variant_id.trim().is_empty() {
            return Err(LedgerError::Validation("variant id is required".into()));
        }
        if self.reason.trim().is_empty() {
            return Err(LedgerError::Validation(
                "a reason is required for every stock adjustment".into(),
            ));
        }
        if self.quantity < 0 {
            let message = match self.mode {
                AdjustmentMode::Set => format!("cannot set stock to {}", self.quantity),
                _ => format!(
                    "adjustment amount must be >= 0, got {} (pick add or subtract instead)",
                    self.quantity
                ),
            };
            return Err(LedgerError::Validation(message));
        }
        Ok(())
    }
}

/// Result of an applied adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentOutcome {
    pub variant_id: String,
    pub previous: i64,
    pub new: i64,
    pub available: i64,
    /// None when the stock write succeeded but the audit append did not.
    pub audit_id: Option<u64>,
}

/// Wire shape of a single adjustment response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<AdjustmentOutcome, LedgerError>> for AdjustResponse {
    fn from(result: &Result<AdjustmentOutcome, LedgerError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                previous: Some(outcome.previous),
                new: Some(outcome.new),
                error: None,
            },
            Err(err) => Self {
                success: false,
                previous: None,
                new: None,
                error: Some(err.user_message()),
            },
        }
    }
}
