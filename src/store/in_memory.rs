//! InMemoryStockStore - HashMap-backed stock store for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::StockStore;
use crate::error::StoreError;
use crate::record::{StockRecord, Versioned};

struct StoredRecord {
    record: StockRecord,
    version: u64,
}

/// In-memory stock store backed by a HashMap. Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    storage: Arc<RwLock<HashMap<String, StoredRecord>>>,
}

impl InMemoryStockStore {
    /// Create a new empty stock store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StockStore for InMemoryStockStore {
    fn get(&self, variant_id: &str) -> Result<Option<Versioned<StockRecord>>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        Ok(storage.get(variant_id).map(|stored| Versioned {
            data: stored.record.clone(),
            version: stored.version,
        }))
    }

    fn insert(&self, record: &StockRecord) -> Result<Versioned<StockRecord>, StoreError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        if storage.contains_key(&record.variant_id) {
            return Err(StoreError::AlreadyExists(record.variant_id.clone()));
        }

        storage.insert(
            record.variant_id.clone(),
            StoredRecord {
                record: record.clone(),
                version: 1,
            },
        );

        Ok(Versioned {
            data: record.clone(),
            version: 1,
        })
    }

    fn update(
        &self,
        record: &StockRecord,
        expected_version: u64,
    ) -> Result<Versioned<StockRecord>, StoreError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        let stored = storage
            .get_mut(&record.variant_id)
            .ok_or_else(|| StoreError::NotFound(record.variant_id.clone()))?;

        if stored.version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                id: record.variant_id.clone(),
                expected: expected_version,
                actual: stored.version,
            });
        }

        stored.record = record.clone();
        stored.version += 1;

        Ok(Versioned {
            data: record.clone(),
            version: stored.version,
        })
    }

    fn find(
        &self,
        predicate: &dyn Fn(&StockRecord) -> bool,
    ) -> Result<Vec<Versioned<StockRecord>>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;

        let mut results: Vec<Versioned<StockRecord>> = storage
            .values()
            .filter(|stored| predicate(&stored.record))
            .map(|stored| Versioned {
                data: stored.record.clone(),
                version: stored.version,
            })
            .collect();
        results.sort_by(|a, b| a.data.variant_id.cmp(&b.data.variant_id));

        Ok(results)
    }
}
