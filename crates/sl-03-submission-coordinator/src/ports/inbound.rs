//! # Inbound Ports
//!
//! The slice of the coordinator the event reconciler drives. Only the
//! coordinator moves record status; the reconciler supplies evidence.

use crate::domain::{
    ConfirmationEvidence, CoordinatorError, FinalizerError, StaleSubmission,
};
use async_trait::async_trait;
use shared_types::{LedgerEvent, RecordId};
use sl_02_transaction_store::TransactionRecord;
use std::time::Duration;

/// Reconciliation API - inbound port.
#[async_trait]
pub trait ReconciliationApi: Send + Sync {
    /// PENDING → CONFIRMED, then the operation's `on_confirmed` finalizer.
    async fn confirm(
        &self,
        record_id: RecordId,
        evidence: ConfirmationEvidence,
    ) -> Result<TransactionRecord, CoordinatorError>;

    /// PENDING (accepted) → FAILED after the ledger reverted the call.
    async fn fail_accepted(
        &self,
        record_id: RecordId,
        reason: &str,
    ) -> Result<TransactionRecord, CoordinatorError>;

    /// Route an event with no matching record to its finalizer.
    ///
    /// Returns `false` when no finalizer handles the event's operation.
    async fn apply_unmatched(&self, event: &LedgerEvent) -> Result<bool, FinalizerError>;

    /// PENDING records older than `threshold`.
    async fn find_stale(&self, threshold: Duration) -> Result<Vec<StaleSubmission>, CoordinatorError>;
}
