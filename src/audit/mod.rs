//! Audit log - append-only history of applied stock adjustments.
//!
//! Only the adjustment engine writes here. There is no update or delete in
//! the `AuditLog` API: an entry is final once appended.

mod in_memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use in_memory::InMemoryAuditLog;

/// One applied adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Assigned by the log on append; 0 until then.
    pub id: u64,
    pub variant_id: String,
    /// Signed delta actually applied.
    pub change_amount: i64,
    pub reason: String,
    pub actor: Option<String>,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Entry for a change from `previous_quantity` to `new_quantity`. Callers
    /// reject changes whose delta does not fit in an `i64`; past that range
    /// `change_amount` saturates.
    pub fn new(
        variant_id: impl Into<String>,
        previous_quantity: i64,
        new_quantity: i64,
        reason: impl Into<String>,
        actor: Option<String>,
    ) -> Self {
        Self {
            id: 0,
            variant_id: variant_id.into(),
            change_amount: new_quantity.saturating_sub(previous_quantity),
            reason: reason.into(),
            actor,
            previous_quantity,
            new_quantity,
            created_at: Utc::now(),
        }
    }
}

pub trait AuditLog: Send + Sync {
    /// Append an entry, returning it with its assigned id.
    fn append(&self, entry: AuditEntry) -> Result<AuditEntry, StoreError>;

    /// Entries for one variant, newest first, at most `limit` if given.
    fn for_variant(
        &self,
        variant_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEntry>, StoreError>;

    /// Number of entries in the log.
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
