//! # Domain Errors

use shared_types::ParamError;
use sl_01_ledger_client::LedgerClientError;
use sl_02_transaction_store::StoreError;
use sl_03_submission_coordinator::{CoordinatorError, FinalizerError};
use thiserror::Error;

/// Reconciliation errors.
///
/// Raised per event; the loop logs, counts and parks the event, then moves on.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Event payload lacks the fields its kind requires.
    #[error("Malformed event: {0}")]
    Malformed(#[from] ParamError),

    /// Record lookup failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Confirming or failing the record failed.
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// Heuristic application of an unmatched event failed.
    #[error(transparent)]
    Finalizer(#[from] FinalizerError),

    /// Subscription or receipt lookup failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerClientError),

    /// Checkpoint persistence failed.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}
