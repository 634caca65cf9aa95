//! StockStore - durable storage of one ledger row per variant.
//!
//! Writes go through `update`, a compare-and-swap on the row version. A
//! backend must perform the version check and the write as one atomic step
//! (a single `UPDATE ... WHERE version = ?` with affected-row verification in
//! SQL, one write-lock critical section in memory). Zero rows affected is a
//! `ConcurrencyConflict`, never a silent overwrite.

mod in_memory;

use crate::error::StoreError;
use crate::record::{StockRecord, Versioned};

pub use in_memory::InMemoryStockStore;

pub trait StockStore: Send + Sync {
    /// Get a record by variant id. Returns None if not found.
    fn get(&self, variant_id: &str) -> Result<Option<Versioned<StockRecord>>, StoreError>;

    /// Insert a new record at version 1. Fails if one already exists.
    fn insert(&self, record: &StockRecord) -> Result<Versioned<StockRecord>, StoreError>;

    /// Replace a record if its stored version still equals `expected_version`.
    fn update(
        &self,
        record: &StockRecord,
        expected_version: u64,
    ) -> Result<Versioned<StockRecord>, StoreError>;

    /// Records matching a predicate, in variant id order.
    fn find(
        &self,
        predicate: &dyn Fn(&StockRecord) -> bool,
    ) -> Result<Vec<Versioned<StockRecord>>, StoreError>;

    /// Every record, in variant id order.
    fn list(&self) -> Result<Vec<Versioned<StockRecord>>, StoreError> {
        self.find(&|_| true)
    }
}
