//! InMemoryAuditLog - Vec-backed audit log.
//!
//! Entries are sealed as bitcode blobs on append, the same way event payloads
//! are kept as opaque bytes in an event store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::{AuditEntry, AuditLog};
use crate::error::StoreError;

struct SealedEntry {
    variant_id: String,
    bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<SealedEntry>>>,
    seq: Arc<AtomicU64>,
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuditLog {
    /// Create an empty log whose first entry gets id 1.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            seq: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, mut entry: AuditEntry) -> Result<AuditEntry, StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Storage("audit lock poisoned".into()))?;

        entry.id = self.seq.fetch_add(1, Ordering::Relaxed);
        let bytes = bitcode::serialize(&entry).map_err(|e| StoreError::Codec(e.to_string()))?;
        entries.push(SealedEntry {
            variant_id: entry.variant_id.clone(),
            bytes,
        });

        Ok(entry)
    }

    fn for_variant(
        &self,
        variant_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Storage("audit lock poisoned".into()))?;

        entries
            .iter()
            .rev()
            .filter(|sealed| sealed.variant_id == variant_id)
            .take(limit.unwrap_or(usize::MAX))
            .map(|sealed| {
                bitcode::deserialize(&sealed.bytes).map_err(|e| StoreError::Codec(e.to_string()))
            })
            .collect()
    }

    fn len(&self) -> Result<usize, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Storage("audit lock poisoned".into()))?;
        Ok(entries.len())
    }
}
