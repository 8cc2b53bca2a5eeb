//! # Domain Errors

use shared_types::{RecordId, TxStatus};
use sl_02_transaction_store::StoreError;
use thiserror::Error;

/// Coordinator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// Underlying store failure, including lifecycle violations.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No record with this id.
    #[error("Transaction record not found: {0}")]
    NotFound(RecordId),

    /// Operation requires a PENDING record.
    #[error("Record {id} is {status}, not PENDING")]
    NotPending {
        /// Record id.
        id: RecordId,
        /// Current status.
        status: TxStatus,
    },

    /// The outcome channel closed before the record resolved.
    #[error("Outcome of {0} is no longer tracked")]
    OutcomeUnavailable(RecordId),
}

/// Error raised by a finalizer. Logged, never propagated to the record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Finalizer failed: {0}")]
pub struct FinalizerError(pub String);

impl FinalizerError {
    /// Wrap any displayable error.
    pub fn new(message: impl ToString) -> Self {
        Self(message.to_string())
    }
}
