//! # Outbound Ports
//!
//! What the coordinator calls out to besides the ledger and the store:
//! per-operation finalizers owned by the domain side, and metrics.

use crate::domain::FinalizerError;
use async_trait::async_trait;
use shared_types::{LedgerEvent, LedgerOperation};
use sl_02_transaction_store::TransactionRecord;

/// Applies the business consequences of a resolved submission.
///
/// Registered per operation. The record transition has already been stored
/// when a hook runs; a hook error is logged and never undoes it.
#[async_trait]
pub trait LedgerFinalizer: Send + Sync {
    /// The record was confirmed. `event` is the confirming event, when the
    /// confirmation came from one.
    async fn on_confirmed(
        &self,
        record: &TransactionRecord,
        event: Option<&LedgerEvent>,
    ) -> Result<(), FinalizerError>;

    /// An event matched no PENDING record; apply it on its own terms.
    async fn on_unmatched(&self, event: &LedgerEvent) -> Result<(), FinalizerError>;

    /// The record failed; compensate the optimistic mutation.
    async fn on_failed(&self, record: &TransactionRecord) -> Result<(), FinalizerError>;
}

/// Metrics sink for submission lifecycle events.
pub trait CoordinatorMetrics: Send + Sync {
    /// A submission reached CONFIRMED or FAILED.
    fn submission_resolved(&self, operation: LedgerOperation, outcome: &'static str);

    /// A transport failure will be retried or has exhausted the budget.
    fn transport_failure(&self, operation: LedgerOperation);

    /// A submission was recorded REDUNDANT.
    fn redundant_submission(&self, operation: LedgerOperation);
}

/// Metrics sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CoordinatorMetrics for NoopMetrics {
    fn submission_resolved(&self, _operation: LedgerOperation, _outcome: &'static str) {}

    fn transport_failure(&self, _operation: LedgerOperation) {}

    fn redundant_submission(&self, _operation: LedgerOperation) {}
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Finalizer that records every call.
#[derive(Debug, Default)]
pub struct RecordingFinalizer {
    /// (hook, record id or tx hash) per call.
    pub calls: parking_lot::Mutex<Vec<(&'static str, String)>>,
    /// Fail every hook?
    pub should_fail: bool,
}

impl RecordingFinalizer {
    /// Hooks invoked so far.
    pub fn hooks(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(|(hook, _)| *hook).collect()
    }

    fn record(&self, hook: &'static str, subject: String) -> Result<(), FinalizerError> {
        self.calls.lock().push((hook, subject));
        if self.should_fail {
            Err(FinalizerError::new("mock failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerFinalizer for RecordingFinalizer {
    async fn on_confirmed(
        &self,
        record: &TransactionRecord,
        _event: Option<&LedgerEvent>,
    ) -> Result<(), FinalizerError> {
        self.record("confirmed", record.id.to_string())
    }

    async fn on_unmatched(&self, event: &LedgerEvent) -> Result<(), FinalizerError> {
        self.record("unmatched", event.transaction_hash.to_string())
    }

    async fn on_failed(&self, record: &TransactionRecord) -> Result<(), FinalizerError> {
        self.record("failed", record.id.to_string())
    }
}
