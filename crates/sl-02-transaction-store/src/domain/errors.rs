//! # Domain Errors
//!
//! Error types for the transaction store.

use shared_types::{ExternalRef, RecordId, TxStatus};
use thiserror::Error;

/// Transaction store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with this id.
    #[error("Transaction record not found: {0}")]
    NotFound(RecordId),

    /// A record with this id already exists.
    #[error("Transaction record already exists: {0}")]
    AlreadyExists(RecordId),

    /// The stored version moved since the record was read.
    #[error("Concurrent update of {id}: expected version {expected}, found {actual}")]
    ConcurrentConflict {
        /// Record id.
        id: RecordId,
        /// Version the writer read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Status change not allowed by the lifecycle.
    #[error("Invalid transition of {id}: {from} -> {to}")]
    InvalidTransition {
        /// Record id.
        id: RecordId,
        /// Current status.
        from: TxStatus,
        /// Attempted status.
        to: TxStatus,
    },

    /// The external reference is write-once.
    #[error("External reference of {id} already set to {existing}")]
    ReferenceAlreadySet {
        /// Record id.
        id: RecordId,
        /// Reference already stored.
        existing: ExternalRef,
    },

    /// Persistent backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// True for optimistic-concurrency conflicts, which are worth retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrentConflict { .. })
    }
}
