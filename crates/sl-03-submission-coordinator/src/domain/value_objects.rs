//! Value objects exchanged with callers of the coordinator.

use super::outcome::OutcomeFuture;
use serde::{Deserialize, Serialize};
use shared_types::{ExternalRef, LedgerEvent, LedgerOperation, RecordId, TxStatus};
use sl_02_transaction_store::TransactionRecord;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A record created but not yet handed to the ledger.
///
/// Callers write their optimistic mutation referencing `record.id` between
/// `prepare` and `dispatch`.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    /// The stored record (PENDING, or REDUNDANT).
    pub record: TransactionRecord,
}

impl PreparedSubmission {
    /// Id of the new record.
    pub fn id(&self) -> RecordId {
        self.record.id
    }

    /// In-flight record this one follows, when redundant.
    pub fn redundant_of(&self) -> Option<RecordId> {
        self.record.redundant_of
    }

    /// True when no ledger call will be made.
    pub fn is_redundant(&self) -> bool {
        self.record.status == TxStatus::Redundant
    }
}

/// Handle returned by `dispatch`/`submit`.
#[derive(Debug)]
pub struct SubmissionHandle {
    /// Record created for this submission.
    pub record_id: RecordId,
    /// In-flight record followed instead of calling the ledger.
    pub redundant_of: Option<RecordId>,
    /// Resolves on CONFIRMED or FAILED.
    pub outcome: OutcomeFuture,
    /// Driving task; `None` for redundant submissions.
    pub task: Option<JoinHandle<()>>,
}

impl SubmissionHandle {
    /// Wait until the driving task has finished (accepted or failed).
    pub async fn driven(&mut self) {
        if let Some(task) = self.task.take() {
            // A panicking driver leaves the record PENDING; staleness covers it.
            let _ = task.await;
        }
    }
}

/// How a driving loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveResult {
    /// Accepted by the ledger; confirmation is up to the reconciler.
    Accepted(ExternalRef),
    /// Rejected or out of retries.
    Failed(String),
    /// Someone else already moved the record.
    AlreadyResolved(TxStatus),
}

/// What proves a record executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEvidence {
    /// Hash of the transaction that emitted the event.
    pub transaction_hash: ExternalRef,
    /// Block of the event.
    pub block_number: Option<u64>,
    /// The event itself, when confirmation came from one.
    pub event: Option<LedgerEvent>,
}

impl ConfirmationEvidence {
    /// Evidence carried by a ledger event.
    pub fn from_event(event: &LedgerEvent) -> Self {
        Self {
            transaction_hash: event.transaction_hash.clone(),
            block_number: Some(event.block_number),
            event: Some(event.clone()),
        }
    }
}

/// A PENDING record older than the staleness threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleSubmission {
    /// Record id.
    pub record_id: RecordId,
    /// Operation.
    pub operation: LedgerOperation,
    /// Time since creation.
    pub age: Duration,
    /// Hash, if the ledger accepted the call.
    pub external_reference: Option<ExternalRef>,
    /// Transport failures so far.
    pub retry_count: u32,
}

impl StaleSubmission {
    /// True if the ledger accepted the call (receipt lookup is possible).
    pub fn is_accepted(&self) -> bool {
        self.external_reference.is_some()
    }
}
