//! # Transaction Record
//!
//! One row per logical submission. Retries update the same row.
//!
//! ```text
//!            ┌─ accept(ref) ──────┐
//!            │                    ▼
//! [PENDING] ─┼─ confirm ────→ [CONFIRMED]
//!            └─ fail ───────→ [FAILED]
//!
//! [REDUNDANT]   (created that way, never moves)
//! ```

use super::errors::StoreError;
use super::invariants::{invariant_monotonic_status, invariant_reference_write_once};
use serde::{Deserialize, Serialize};
use shared_types::{
    ExternalRef, Fingerprint, LedgerOperation, Parameters, RecordId, Timestamp, TxStatus,
};

/// A submission of one operation to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Local identifier.
    pub id: RecordId,
    /// Remote operation.
    pub operation: LedgerOperation,
    /// Call parameters; immutable after creation.
    pub parameters: Parameters,
    /// Identity of the intent (operation + all parameters).
    pub fingerprint: Fingerprint,
    /// Identity the ledger echoes back (operation + key parameters).
    pub match_key: Fingerprint,
    /// Lifecycle status.
    pub status: TxStatus,
    /// For REDUNDANT records, the in-flight record this one follows.
    pub redundant_of: Option<RecordId>,
    /// Ledger transaction hash; written at most once.
    pub external_reference: Option<ExternalRef>,
    /// Creation time (ms).
    pub created_at: Timestamp,
    /// Time of the latest submission attempt (ms).
    pub last_attempt_at: Option<Timestamp>,
    /// Time the ledger confirmed execution (ms).
    pub confirmed_at: Option<Timestamp>,
    /// Block of the confirming event.
    pub block_number: Option<u64>,
    /// Failed transport attempts so far.
    pub retry_count: u32,
    /// Diagnostic for FAILED records.
    pub failure_reason: Option<String>,
    /// Optimistic-concurrency version, bumped by every stored update.
    pub version: u64,
}

impl TransactionRecord {
    /// New PENDING record.
    pub fn new(
        operation: LedgerOperation,
        parameters: Parameters,
        match_key: Fingerprint,
        now: Timestamp,
    ) -> Self {
        let fingerprint = Fingerprint::of(operation, parameters.values());
        Self {
            id: RecordId::new(),
            operation,
            parameters,
            fingerprint,
            match_key,
            status: TxStatus::Pending,
            redundant_of: None,
            external_reference: None,
            created_at: now,
            last_attempt_at: None,
            confirmed_at: None,
            block_number: None,
            retry_count: 0,
            failure_reason: None,
            version: 0,
        }
    }

    /// New REDUNDANT record following `primary`.
    pub fn redundant(primary: &TransactionRecord, now: Timestamp) -> Self {
        Self {
            status: TxStatus::Redundant,
            redundant_of: Some(primary.id),
            ..Self::new(
                primary.operation,
                primary.parameters.clone(),
                primary.match_key.clone(),
                now,
            )
        }
    }

    /// True while waiting for the ledger.
    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }

    /// True once the ledger accepted a submission.
    pub fn is_accepted(&self) -> bool {
        self.external_reference.is_some()
    }

    /// Age at `now` (ms).
    pub fn age(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.created_at)
    }

    /// Note a submission attempt.
    pub fn mark_attempt(&mut self, now: Timestamp) -> Result<(), StoreError> {
        self.require_pending(TxStatus::Pending)?;
        self.last_attempt_at = Some(now);
        Ok(())
    }

    /// The ledger accepted the call; store its hash. Status stays PENDING.
    pub fn accept(&mut self, reference: ExternalRef) -> Result<(), StoreError> {
        self.require_pending(TxStatus::Pending)?;
        invariant_reference_write_once(self.id, self.external_reference.as_ref(), &reference)?;
        self.external_reference = Some(reference);
        Ok(())
    }

    /// A retryable transport failure; returns the new retry count.
    pub fn record_transport_failure(&mut self, now: Timestamp) -> Result<u32, StoreError> {
        self.require_pending(TxStatus::Pending)?;
        self.retry_count += 1;
        self.last_attempt_at = Some(now);
        Ok(self.retry_count)
    }

    /// The ledger executed the call.
    ///
    /// The reference is filled in when still unset; an existing one is kept.
    pub fn confirm(
        &mut self,
        reference: ExternalRef,
        block_number: Option<u64>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        invariant_monotonic_status(self.id, self.status, TxStatus::Confirmed)?;
        if self.external_reference.is_none() {
            self.external_reference = Some(reference);
        }
        self.status = TxStatus::Confirmed;
        self.confirmed_at = Some(now);
        self.block_number = block_number;
        Ok(())
    }

    /// Terminal failure.
    pub fn fail(&mut self, reason: impl Into<String>, now: Timestamp) -> Result<(), StoreError> {
        invariant_monotonic_status(self.id, self.status, TxStatus::Failed)?;
        self.status = TxStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.last_attempt_at.get_or_insert(now);
        Ok(())
    }

    fn require_pending(&self, to: TxStatus) -> Result<(), StoreError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(StoreError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            })
        }
    }
}
