//! AdjustmentEngine - validates and applies changes to one stock record.
//!
//! Every write is read → compute → conditional update against the version
//! that was read. A lost race comes back from the store as
//! `ConcurrencyConflict` and is retried from a fresh read, so two concurrent
//! adjustments never overwrite each other's delta.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{AdjustmentOutcome, AdjustmentRequest};
use crate::audit::{AuditEntry, AuditLog};
use crate::error::LedgerError;
use crate::record::{StockRecord, StockSettings, Versioned};
use crate::store::StockStore;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjustOptions {
    /// Upper bound for the whole call, retries included.
    pub timeout: Option<Duration>,
}

impl AdjustOptions {
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[derive(Clone, Copy)]
struct Deadline(Option<Instant>);

impl Deadline {
    fn after(timeout: Option<Duration>) -> Self {
        Deadline(timeout.map(|t| Instant::now() + t))
    }

    fn check(&self, variant_id: &str) -> Result<(), LedgerError> {
        match self.0 {
            Some(at) if Instant::now() >= at => Err(LedgerError::Timeout(variant_id.to_string())),
            _ => Ok(()),
        }
    }
}

/// Stateless over its collaborators: safe to share across threads.
#[derive(Clone)]
pub struct AdjustmentEngine {
    store: Arc<dyn StockStore>,
    audit: Arc<dyn AuditLog>,
    max_conflict_retries: u32,
    default_low_stock_threshold: i64,
}

impl AdjustmentEngine {
    pub fn new(store: Arc<dyn StockStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            store,
            audit,
            max_conflict_retries: 1,
            default_low_stock_threshold: crate::record::DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn with_default_threshold(mut self, threshold: i64) -> Self {
        self.default_low_stock_threshold = threshold;
        self
    }

    pub fn store(&self) -> &Arc<dyn StockStore> {
        &self.store
    }

    pub fn audit(&self) -> &Arc<dyn AuditLog> {
        &self.audit
    }

    /// Create the ledger row for a catalog variant, starting at zero stock.
    pub fn register(
        &self,
        variant_id: &str,
        sku: Option<String>,
        settings: &StockSettings,
    ) -> Result<StockRecord, LedgerError> {
        if variant_id.trim().is_empty() {
            return Err(LedgerError::Validation("variant id is required".into()));
        }
        let mut record = StockRecord::new(variant_id);
        record.sku = sku;
        record.low_stock_threshold = self.default_low_stock_threshold;
        let record = record.with_settings(settings)?;

        let saved = self.store.insert(&record)?;
        tracing::debug!(variant_id, "registered stock record");
        Ok(saved.data)
    }

    pub fn adjust(&self, request: &AdjustmentRequest) -> Result<AdjustmentOutcome, LedgerError> {
        self.adjust_with(request, AdjustOptions::default())
    }

    /// Apply one adjustment. Exactly one audit entry is written on success and
    /// none on failure.
    pub fn adjust_with(
        &self,
        request: &AdjustmentRequest,
        opts: AdjustOptions,
    ) -> Result<AdjustmentOutcome, LedgerError> {
        request.validate()?;
        let deadline = Deadline::after(opts.timeout);

        let (previous, saved) = self.mutate(&request.variant_id, deadline, |current| {
            let new_quantity = request
                .mode
                .apply(current.quantity, request.quantity)
                .ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "adjustment of {} overflows the stock counter",
                        request.variant_id
                    ))
                })?;

            if new_quantity < 0 && !current.allow_backorders {
                return Err(LedgerError::InvalidAdjustment(format!(
                    "{} would go negative ({} -> {})",
                    request.variant_id, current.quantity, new_quantity
                )));
            }

            new_quantity.checked_sub(current.quantity).ok_or_else(|| {
                LedgerError::Validation(format!(
                    "change of {} from {} to {} overflows the audit delta",
                    request.variant_id, current.quantity, new_quantity
                ))
            })?;

            current.with_quantity(new_quantity)
        })?;

        let entry = AuditEntry::new(
            &request.variant_id,
            previous.quantity,
            saved.data.quantity,
            request.reason.trim(),
            request.actor.clone(),
        );
        let audit_id = match self.audit.append(entry) {
            Ok(stored) => Some(stored.id),
            Err(err) => {
                tracing::error!(
                    variant_id = %request.variant_id,
                    previous = previous.quantity,
                    new = saved.data.quantity,
                    error = %err,
                    "stock adjusted but audit entry was not written"
                );
                None
            }
        };

        tracing::debug!(
            variant_id = %request.variant_id,
            mode = ?request.mode,
            previous = previous.quantity,
            new = saved.data.quantity,
            "stock adjusted"
        );

        Ok(AdjustmentOutcome {
            variant_id: request.variant_id.clone(),
            previous: previous.quantity,
            new: saved.data.quantity,
            available: saved.data.available_quantity,
            audit_id,
        })
    }

    /// Move `quantity` units from available into reserved.
    pub fn reserve(&self, variant_id: &str, quantity: i64) -> Result<StockRecord, LedgerError> {
        positive(variant_id, quantity)?;
        let (_, saved) = self.mutate(variant_id, Deadline(None), |current| {
            let reserved = current.reserved_quantity.checked_add(quantity).ok_or_else(|| {
                LedgerError::Validation(format!(
                    "reserving {quantity} more of {variant_id} overflows the reserved count"
                ))
            })?;
            let next = current.with_reserved(reserved)?;
            if next.available_quantity < 0 && !current.allow_backorders {
                return Err(LedgerError::InvalidAdjustment(format!(
                    "{variant_id} has {} available, cannot reserve {quantity}",
                    current.available_quantity
                )));
            }
            Ok(next)
        })?;
        Ok(saved.data)
    }

    /// Return `quantity` reserved units to available.
    pub fn release(&self, variant_id: &str, quantity: i64) -> Result<StockRecord, LedgerError> {
        positive(variant_id, quantity)?;
        let (_, saved) = self.mutate(variant_id, Deadline(None), |current| {
            if quantity > current.reserved_quantity {
                return Err(LedgerError::InvalidAdjustment(format!(
                    "{variant_id} has {} reserved, cannot release {quantity}",
                    current.reserved_quantity
                )));
            }
            current.with_reserved(current.reserved_quantity - quantity)
        })?;
        Ok(saved.data)
    }

    pub fn update_settings(
        &self,
        variant_id: &str,
        settings: &StockSettings,
    ) -> Result<StockRecord, LedgerError> {
        settings.validate()?;
        let (_, saved) = self.mutate(variant_id, Deadline(None), |current| {
            let next = current.with_settings(settings)?;
            if next.quantity < 0 && !next.allow_backorders {
                return Err(LedgerError::InvalidAdjustment(format!(
                    "{variant_id} is backordered ({}), restock before disabling backorders",
                    next.quantity
                )));
            }
            Ok(next)
        })?;
        Ok(saved.data)
    }

    /// Read, compute, conditionally write; retry from a fresh read after a
    /// lost race. Returns the record as read and as stored.
    fn mutate<F>(
        &self,
        variant_id: &str,
        deadline: Deadline,
        compute: F,
    ) -> Result<(StockRecord, Versioned<StockRecord>), LedgerError>
    where
        F: Fn(&StockRecord) -> Result<StockRecord, LedgerError>,
    {
        let mut attempt = 0;
        loop {
            deadline.check(variant_id)?;
            let current = self
                .store
                .get(variant_id)?
                .ok_or_else(|| LedgerError::NotFound(variant_id.to_string()))?;

            let next = compute(&current.data).inspect_err(|err| {
                tracing::warn!(variant_id, error = %err, "stock change rejected");
            })?;

            deadline.check(variant_id)?;
            match self.store.update(&next, current.version) {
                Ok(saved) => return Ok((current.data, saved)),
                Err(err) => match LedgerError::from(err) {
                    LedgerError::ConcurrencyConflict(_) if attempt < self.max_conflict_retries => {
                        attempt += 1;
                        tracing::warn!(variant_id, attempt, "stock update lost a race, retrying");
                    }
                    other => return Err(other),
                },
            }
        }
    }
}

fn positive(variant_id: &str, quantity: i64) -> Result<(), LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::Validation(format!(
            "quantity for {variant_id} must be > 0, got {quantity}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditLog;
    use crate::error::StoreError;
    use crate::store::InMemoryStockStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn engine_with(quantity: i64, reserved: i64) -> (AdjustmentEngine, Arc<InMemoryAuditLog>) {
        let store = Arc::new(InMemoryStockStore::new());
        store
            .insert(
                &StockRecord::new("v1")
                    .with_quantity(quantity)
                    .unwrap()
                    .with_reserved(reserved)
                    .unwrap(),
            )
            .unwrap();
        let audit = Arc::new(InMemoryAuditLog::new());
        (AdjustmentEngine::new(store, audit.clone()), audit)
    }

    #[test]
    fn subtract_past_zero_is_rejected_and_writes_nothing() {
        let (engine, audit) = engine_with(10, 2);
        let err = engine
            .adjust(&AdjustmentRequest::subtract("v1", 12, "damaged"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAdjustment(_)));

        let record = engine.store().get("v1").unwrap().unwrap().data;
        assert_eq!(record.quantity, 10);
        assert_eq!(audit.len().unwrap(), 0);
    }

    #[test]
    fn subtract_updates_available_and_audits() {
        let (engine, audit) = engine_with(10, 2);
        let outcome = engine
            .adjust(&AdjustmentRequest::subtract("v1", 8, "sold"))
            .unwrap();
        assert_eq!(outcome.previous, 10);
        assert_eq!(outcome.new, 2);
        assert_eq!(outcome.available, 0);

        let entries = audit.for_variant("v1", None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].change_amount, -8);
        assert_eq!(Some(entries[0].id), outcome.audit_id);
    }

    #[test]
    fn set_records_actual_delta() {
        let (engine, audit) = engine_with(10, 0);
        engine
            .adjust(&AdjustmentRequest::set("v1", 4, "stocktake"))
            .unwrap();
        let entry = &audit.for_variant("v1", None).unwrap()[0];
        assert_eq!(entry.change_amount, -6);
        assert_eq!(entry.new_quantity - entry.previous_quantity, entry.change_amount);
    }

    #[test]
    fn empty_reason_fails_before_reading() {
        let (engine, audit) = engine_with(10, 0);
        let err = engine
            .adjust(&AdjustmentRequest::add("missing", 1, "   "))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(audit.len().unwrap(), 0);
    }

    #[test]
    fn unknown_variant_is_not_found() {
        let (engine, _) = engine_with(10, 0);
        let err = engine
            .adjust(&AdjustmentRequest::add("nope", 1, "restock"))
            .unwrap_err();
        assert_eq!(err, LedgerError::NotFound("nope".into()));
    }

    #[test]
    fn backorders_allow_negative_stock() {
        let (engine, _) = engine_with(1, 0);
        engine
            .update_settings("v1", &StockSettings::backorders(true))
            .unwrap();
        let outcome = engine
            .adjust(&AdjustmentRequest::subtract("v1", 3, "preorder"))
            .unwrap();
        assert_eq!(outcome.new, -2);
    }

    #[test]
    fn disabling_backorders_while_negative_is_rejected() {
        let (engine, _) = engine_with(0, 0);
        engine
            .update_settings("v1", &StockSettings::backorders(true))
            .unwrap();
        engine
            .adjust(&AdjustmentRequest::subtract("v1", 2, "preorder"))
            .unwrap();
        let err = engine
            .update_settings("v1", &StockSettings::backorders(false))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAdjustment(_)));
    }

    #[test]
    fn expired_deadline_is_a_timeout() {
        let (engine, audit) = engine_with(5, 0);
        let err = engine
            .adjust_with(
                &AdjustmentRequest::add("v1", 1, "restock"),
                AdjustOptions::timeout(Duration::ZERO),
            )
            .unwrap_err();
        assert_eq!(err, LedgerError::Timeout("v1".into()));
        assert_eq!(audit.len().unwrap(), 0);
    }

    #[test]
    fn reserve_and_release_keep_invariant() {
        let (engine, _) = engine_with(5, 0);
        let record = engine.reserve("v1", 3).unwrap();
        assert_eq!(record.available_quantity, 2);
        assert!(engine.reserve("v1", 3).is_err());

        let record = engine.release("v1", 3).unwrap();
        assert_eq!(record.reserved_quantity, 0);
        assert_eq!(record.available_quantity, 5);
        assert!(engine.release("v1", 1).is_err());
    }

    #[test]
    fn register_uses_configured_threshold() {
        let store = Arc::new(InMemoryStockStore::new());
        let engine = AdjustmentEngine::new(store, Arc::new(InMemoryAuditLog::new()))
            .with_default_threshold(12);
        let record = engine
            .register("v1", Some("SKU-1".into()), &StockSettings::default())
            .unwrap();
        assert_eq!(record.low_stock_threshold, 12);
        assert_eq!(record.quantity, 0);

        let err = engine
            .register("v1", None, &StockSettings::default())
            .unwrap_err();
        assert_eq!(err, LedgerError::AlreadyExists("v1".into()));
    }

    /// Fails the first `conflicts` updates as if another writer got there first.
    struct RacingStore {
        inner: InMemoryStockStore,
        conflicts: AtomicU32,
    }

    impl StockStore for RacingStore {
        fn get(&self, id: &str) -> Result<Option<Versioned<StockRecord>>, StoreError> {
            self.inner.get(id)
        }
        fn insert(&self, record: &StockRecord) -> Result<Versioned<StockRecord>, StoreError> {
            self.inner.insert(record)
        }
        fn update(
            &self,
            record: &StockRecord,
            expected_version: u64,
        ) -> Result<Versioned<StockRecord>, StoreError> {
            if self.conflicts.load(Ordering::SeqCst) > 0 {
                self.conflicts.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::ConcurrencyConflict {
                    id: record.variant_id.clone(),
                    expected: expected_version,
                    actual: expected_version + 1,
                });
            }
            self.inner.update(record, expected_version)
        }
        fn find(
            &self,
            predicate: &dyn Fn(&StockRecord) -> bool,
        ) -> Result<Vec<Versioned<StockRecord>>, StoreError> {
            self.inner.find(predicate)
        }
    }

    fn racing_engine(conflicts: u32) -> AdjustmentEngine {
        let inner = InMemoryStockStore::new();
        inner
            .insert(&StockRecord::new("v1").with_quantity(5).unwrap())
            .unwrap();
        let store = Arc::new(RacingStore {
            inner,
            conflicts: AtomicU32::new(conflicts),
        });
        AdjustmentEngine::new(store, Arc::new(InMemoryAuditLog::new()))
    }

    #[test]
    fn single_conflict_is_retried() {
        let engine = racing_engine(1);
        let outcome = engine
            .adjust(&AdjustmentRequest::add("v1", 1, "restock"))
            .unwrap();
        assert_eq!(outcome.new, 6);
    }

    #[test]
    fn repeated_conflict_surfaces() {
        let engine = racing_engine(2);
        let err = engine
            .adjust(&AdjustmentRequest::add("v1", 1, "restock"))
            .unwrap_err();
        assert_eq!(err, LedgerError::ConcurrencyConflict("v1".into()));
    }

    #[test]
    fn set_past_delta_range_is_rejected_before_writing() {
        let (engine, audit) = engine_with(0, 0);
        engine
            .update_settings("v1", &StockSettings::backorders(true))
            .unwrap();
        engine
            .adjust(&AdjustmentRequest::subtract("v1", 1, "preorder"))
            .unwrap();

        let err = engine
            .adjust(&AdjustmentRequest::set("v1", i64::MAX, "count"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let record = engine.store().get("v1").unwrap().unwrap().data;
        assert_eq!(record.quantity, -1);
        assert_eq!(audit.len().unwrap(), 1);
    }

    #[test]
    fn subtract_past_available_range_is_rejected() {
        let (engine, audit) = engine_with(0, 1);
        engine
            .update_settings("v1", &StockSettings::backorders(true))
            .unwrap();
        engine
            .adjust(&AdjustmentRequest::subtract("v1", 1, "preorder"))
            .unwrap();

        let err = engine
            .adjust(&AdjustmentRequest::subtract("v1", i64::MAX, "preorder"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(engine.store().get("v1").unwrap().unwrap().data.quantity, -1);
        assert_eq!(audit.len().unwrap(), 1);
    }

    #[test]
    fn reserve_past_counter_range_is_rejected() {
        let (engine, _) = engine_with(5, 0);
        engine
            .update_settings("v1", &StockSettings::backorders(true))
            .unwrap();
        engine.reserve("v1", i64::MAX).unwrap();

        let err = engine.reserve("v1", 1).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        let record = engine.store().get("v1").unwrap().unwrap().data;
        assert_eq!(record.reserved_quantity, i64::MAX);
        assert!(record.is_consistent());
    }

    /// Rejects every append.
    struct UnavailableAuditLog;

    impl AuditLog for UnavailableAuditLog {
        fn append(&self, _entry: AuditEntry) -> Result<AuditEntry, StoreError> {
            Err(StoreError::Storage("audit table unavailable".into()))
        }
        fn for_variant(
            &self,
            _variant_id: &str,
            _limit: Option<usize>,
        ) -> Result<Vec<AuditEntry>, StoreError> {
            Ok(Vec::new())
        }
        fn len(&self) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    #[test]
    fn failed_audit_append_keeps_the_stock_change() {
        let store = Arc::new(InMemoryStockStore::new());
        store
            .insert(&StockRecord::new("v1").with_quantity(5).unwrap())
            .unwrap();
        let engine = AdjustmentEngine::new(store.clone(), Arc::new(UnavailableAuditLog));

        let outcome = engine
            .adjust(&AdjustmentRequest::add("v1", 3, "restock"))
            .unwrap();
        assert_eq!(outcome.previous, 5);
        assert_eq!(outcome.new, 8);
        assert!(outcome.audit_id.is_none());
        assert_eq!(store.get("v1").unwrap().unwrap().data.quantity, 8);
    }
}
