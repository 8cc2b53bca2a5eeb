//! # Domain Invariants
//!
//! Lifecycle rules every `TransactionRecord` obeys.

use super::errors::StoreError;
use shared_types::{ExternalRef, RecordId, TxStatus};

/// Invariant: status transitions are monotonic.
///
/// Only PENDING moves, and only to CONFIRMED or FAILED. Terminal statuses
/// never change again.
pub fn invariant_monotonic_status(
    id: RecordId,
    from: TxStatus,
    to: TxStatus,
) -> Result<(), StoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition { id, from, to })
    }
}

/// Invariant: the external reference is written at most once.
///
/// Writing the same value again is allowed.
pub fn invariant_reference_write_once(
    id: RecordId,
    existing: Option<&ExternalRef>,
    new: &ExternalRef,
) -> Result<(), StoreError> {
    match existing {
        Some(current) if current != new => Err(StoreError::ReferenceAlreadySet {
            id,
            existing: current.clone(),
        }),
        _ => Ok(()),
    }
}
