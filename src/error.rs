//! Error types for the stock ledger.
//!
//! `StoreError` is what storage backends (stock rows, audit log) report.
//! `LedgerError` is the taxonomy callers of the ledger see.

use thiserror::Error;

/// Error type for stock store and audit log operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Conditional update lost the race against another writer.
    #[error("concurrency conflict on {id} (expected version {expected}, actual {actual})")]
    ConcurrencyConflict {
        id: String,
        expected: u64,
        actual: u64,
    },
    /// No row stored under this variant.
    #[error("stock record not found: {0}")]
    NotFound(String),
    /// A row already exists for this variant.
    #[error("stock record already exists: {0}")]
    AlreadyExists(String),
    /// Encoding or decoding a stored blob failed.
    #[error("codec error: {0}")]
    Codec(String),
    /// Storage-level error (poisoned lock, backend failure).
    #[error("storage error: {0}")]
    Storage(String),
}

/// Error type for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Unknown variant.
    #[error("stock record not found: {0}")]
    NotFound(String),
    /// Missing or invalid input (empty reason, negative amount, bad settings).
    #[error("validation error: {0}")]
    Validation(String),
    /// Applying the change would break the stock invariant.
    #[error("invalid adjustment: {0}")]
    InvalidAdjustment(String),
    /// The conditional update kept losing the race; the caller may retry.
    #[error("concurrency conflict on {0}, retry the adjustment")]
    ConcurrencyConflict(String),
    /// Deadline passed. The outcome is unknown and the record must be re-read.
    #[error("adjustment of {0} timed out, outcome unknown: re-read the record")]
    Timeout(String),
    /// Already-registered variant.
    #[error("stock record already exists: {0}")]
    AlreadyExists(String),
    /// Underlying persistence failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrencyConflict { id, .. } => LedgerError::ConcurrencyConflict(id),
            StoreError::NotFound(id) => LedgerError::NotFound(id),
            StoreError::AlreadyExists(id) => LedgerError::AlreadyExists(id),
            StoreError::Codec(msg) | StoreError::Storage(msg) => LedgerError::Storage(msg),
        }
    }
}

impl LedgerError {
    /// Map this error to an HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::NotFound(_) => 404,
            LedgerError::Validation(_) => 422,
            LedgerError::InvalidAdjustment(_) => 422,
            LedgerError::ConcurrencyConflict(_) => 409,
            LedgerError::Timeout(_) => 504,
            LedgerError::AlreadyExists(_) => 409,
            LedgerError::Storage(_) => 500,
        }
    }

    /// Text meant for the person who asked for the change.
    pub fn user_message(&self) -> String {
        match self {
            LedgerError::InvalidAdjustment(msg) => {
                format!("{msg}; enable backorders first to allow negative stock")
            }
            LedgerError::ConcurrencyConflict(_) => {
                "stock changed while saving, please try again".to_string()
            }
            other => other.to_string(),
        }
    }
}
