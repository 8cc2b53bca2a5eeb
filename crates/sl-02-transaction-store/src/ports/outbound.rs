//! # Outbound Ports
//!
//! Persistence of `TransactionRecord`s.
//!
//! ## Optimistic Concurrency
//!
//! `update` succeeds only if the stored version equals the version of the
//! record being written; the stored copy then carries `version + 1`. A stale
//! writer gets `StoreError::ConcurrentConflict` and must re-read.

use crate::domain::{StoreError, TransactionRecord};
use shared_types::{ExternalRef, Fingerprint, LedgerOperation, RecordId, Timestamp, TxStatus};
use std::time::Duration;

/// Transaction ledger store - outbound port.
///
/// Query methods have default implementations on top of `scan`; adapters
/// with indexes may override them.
pub trait TransactionStore: Send + Sync {
    /// Insert a new record.
    fn create(&self, record: &TransactionRecord) -> Result<(), StoreError>;

    /// Load a record.
    fn get(&self, id: RecordId) -> Result<Option<TransactionRecord>, StoreError>;

    /// Version-checked write. Returns the stored copy.
    fn update(&self, record: &TransactionRecord) -> Result<TransactionRecord, StoreError>;

    /// Every record matching `predicate`, in creation order.
    fn scan(
        &self,
        predicate: &dyn Fn(&TransactionRecord) -> bool,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Records with `status`.
    fn find_by_status(&self, status: TxStatus) -> Result<Vec<TransactionRecord>, StoreError> {
        self.scan(&|r| r.status == status)
    }

    /// PENDING records created more than `older_than` before `now`.
    fn find_pending_older_than(
        &self,
        older_than: Duration,
        now: Timestamp,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let threshold = older_than.as_millis() as u64;
        self.scan(&|r| r.is_pending() && r.age(now) > threshold)
    }

    /// Oldest PENDING record with the same intent.
    fn find_in_flight(
        &self,
        operation: LedgerOperation,
        fingerprint: &Fingerprint,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self
            .scan(&|r| r.is_pending() && r.operation == operation && &r.fingerprint == fingerprint)?
            .into_iter()
            .next())
    }

    /// PENDING records of `operation` with `match_key` created at or after
    /// `since`, oldest first.
    fn find_pending_by_match_key(
        &self,
        operation: LedgerOperation,
        match_key: &Fingerprint,
        since: Timestamp,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.scan(&|r| {
            r.is_pending()
                && r.operation == operation
                && &r.match_key == match_key
                && r.created_at >= since
        })
    }

    /// Record carrying `reference`.
    fn find_by_external_ref(
        &self,
        reference: &ExternalRef,
    ) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self
            .scan(&|r| r.external_reference.as_ref() == Some(reference))?
            .into_iter()
            .next())
    }
}
