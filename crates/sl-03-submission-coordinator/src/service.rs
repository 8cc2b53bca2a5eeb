//! # Submission Coordinator Service
//!
//! Application service that owns every status transition of a
//! `TransactionRecord`.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Implements the inbound port (`ReconciliationApi`) for the reconciler
//! - Drives the outbound `LedgerClient` with bounded retries
//! - Invokes per-operation `LedgerFinalizer`s after each terminal transition
//!
//! ## Driving Loop
//!
//! ```text
//! prepare ──→ [PENDING] ──dispatch──→ submit()
//!                                        │
//!              ┌─────── Ok(hash) ────────┤──── Rejected ────→ [FAILED]
//!              ▼                         │
//!     PENDING + reference          Transport error
//!     (reconciler confirms)              │
//!                                retry_count += 1
//!                                        │
//!                         exhausted? ──yes──→ [FAILED] "max retries exceeded"
//!                                        │no
//!                                  sleep(backoff) ──→ submit()
//! ```

use crate::domain::{
    ConfirmationEvidence, CoordinatorError, DriveResult, FinalizerError, OutcomeFuture,
    OutcomeRegistry, PreparedSubmission, RetryPolicy, StaleSubmission, SubmissionHandle,
    SubmissionOutcome,
};
use crate::finalizers::FinalizerRegistry;
use crate::ports::{CoordinatorMetrics, LedgerFinalizer, NoopMetrics, ReconciliationApi};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    Fingerprint, LedgerEvent, LedgerOperation, Parameters, RecordId, TimeSource,
    Timestamp, TxStatus,
};
use sl_01_ledger_client::{ContractBinding, LedgerClient, SubmissionError};
use sl_02_transaction_store::{modify, StoreError, TransactionRecord, TransactionStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Reason stored when transport retries run out.
pub const MAX_RETRIES_EXCEEDED: &str = "max retries exceeded";

/// Submission Coordinator.
pub struct SubmissionCoordinator {
    store: Arc<dyn TransactionStore>,
    ledger: Arc<dyn LedgerClient>,
    binding: Arc<dyn ContractBinding>,
    time: Arc<dyn TimeSource>,
    policy: RetryPolicy,
    finalizers: FinalizerRegistry,
    outcomes: OutcomeRegistry,
    metrics: Arc<dyn CoordinatorMetrics>,
    /// Serializes the in-flight lookup with record creation.
    prepare_lock: Mutex<()>,
}

impl SubmissionCoordinator {
    /// Create a coordinator.
    pub fn new(
        store: Arc<dyn TransactionStore>,
        ledger: Arc<dyn LedgerClient>,
        binding: Arc<dyn ContractBinding>,
        time: Arc<dyn TimeSource>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            ledger,
            binding,
            time,
            policy,
            finalizers: FinalizerRegistry::new(),
            outcomes: OutcomeRegistry::new(),
            metrics: Arc::new(NoopMetrics),
            prepare_lock: Mutex::new(()),
        }
    }

    /// Report lifecycle metrics to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn CoordinatorMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Install the finalizer for `operation`.
    pub fn register_finalizer(&self, operation: LedgerOperation, finalizer: Arc<dyn LedgerFinalizer>) {
        self.finalizers.register(operation, finalizer);
    }

    /// True when a finalizer is installed for `operation`.
    pub fn has_finalizer(&self, operation: LedgerOperation) -> bool {
        self.finalizers.get(operation).is_some()
    }

    /// Retry policy in force.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Record store.
    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    /// Contract binding.
    pub fn binding(&self) -> &Arc<dyn ContractBinding> {
        &self.binding
    }

    fn now(&self) -> Timestamp {
        self.time.now()
    }

    // =========================================================================
    // SUBMISSION
    // =========================================================================

    /// Create the record for an intent without calling the ledger.
    ///
    /// If an identical intent is already PENDING, the new record is created
    /// REDUNDANT and will never reach the ledger.
    pub fn prepare(
        &self,
        operation: LedgerOperation,
        parameters: Parameters,
    ) -> Result<PreparedSubmission, CoordinatorError> {
        let now = self.now();
        let fingerprint = Fingerprint::of(operation, parameters.values());
        let match_key = self.binding.match_key(operation, &parameters);

        let _guard = self.prepare_lock.lock();

        let record = match self.store.find_in_flight(operation, &fingerprint)? {
            Some(primary) => {
                let record = TransactionRecord::redundant(&primary, now);
                self.store.create(&record)?;
                self.metrics.redundant_submission(operation);
                info!(
                    record_id = %record.id,
                    redundant_of = %primary.id,
                    operation = %operation,
                    fingerprint = fingerprint.short(),
                    "[sl-03] Identical submission in flight, recorded as redundant"
                );
                record
            }
            None => {
                let record = TransactionRecord::new(operation, parameters, match_key, now);
                self.store.create(&record)?;
                debug!(
                    record_id = %record.id,
                    operation = %operation,
                    fingerprint = fingerprint.short(),
                    "[sl-03] Submission prepared"
                );
                record
            }
        };

        Ok(PreparedSubmission { record })
    }

    /// Start driving a prepared record in the background.
    pub fn dispatch(
        self: &Arc<Self>,
        prepared: PreparedSubmission,
    ) -> Result<SubmissionHandle, CoordinatorError> {
        let record_id = prepared.id();
        let outcome = self.outcome(record_id)?;

        let task = if prepared.is_redundant() {
            None
        } else {
            let this = Arc::clone(self);
            Some(tokio::spawn(async move {
                if let Err(e) = this.drive(record_id).await {
                    error!(record_id = %record_id, error = %e, "[sl-03] Driving task failed");
                }
            }))
        };

        Ok(SubmissionHandle {
            record_id,
            redundant_of: prepared.redundant_of(),
            outcome,
            task,
        })
    }

    /// `prepare` followed by `dispatch`.
    pub fn submit(
        self: &Arc<Self>,
        operation: LedgerOperation,
        parameters: Parameters,
    ) -> Result<SubmissionHandle, CoordinatorError> {
        let prepared = self.prepare(operation, parameters)?;
        self.dispatch(prepared)
    }

    /// Submit a PENDING record until the ledger accepts it, rejects it, or
    /// the retry budget runs out.
    ///
    /// Accepted records are never resubmitted.
    pub async fn drive(&self, record_id: RecordId) -> Result<DriveResult, CoordinatorError> {
        loop {
            let record = self.load(record_id)?;
            if !record.is_pending() {
                return Ok(DriveResult::AlreadyResolved(record.status));
            }
            if let Some(reference) = record.external_reference.clone() {
                return Ok(DriveResult::Accepted(reference));
            }

            let now = self.now();
            if let Some(status) = self.write(record_id, |r| r.mark_attempt(now))? {
                return Ok(DriveResult::AlreadyResolved(status));
            }

            debug!(
                record_id = %record_id,
                operation = %record.operation,
                retry_count = record.retry_count,
                "[sl-03] Submitting to ledger"
            );

            match self.ledger.submit(record.operation, &record.parameters).await {
                Ok(reference) => {
                    let stored = reference.clone();
                    if let Some(status) = self.write(record_id, move |r| r.accept(stored.clone()))? {
                        debug!(
                            record_id = %record_id,
                            status = %status,
                            "[sl-03] Record resolved before acceptance was stored"
                        );
                        return Ok(DriveResult::AlreadyResolved(status));
                    }
                    info!(
                        record_id = %record_id,
                        operation = %record.operation,
                        tx_hash = %reference,
                        "[sl-03] Submission accepted by ledger"
                    );
                    return Ok(DriveResult::Accepted(reference));
                }
                Err(SubmissionError::Rejected { reason }) => {
                    let reason = format!("rejected: {reason}");
                    self.finish_failed(record_id, &reason).await?;
                    return Ok(DriveResult::Failed(reason));
                }
                Err(SubmissionError::Transport { kind, message }) => {
                    self.metrics.transport_failure(record.operation);
                    let now = self.now();
                    let retry_count = match modify(self.store.as_ref(), record_id, |r| {
                        r.record_transport_failure(now)
                    }) {
                        Ok((_, count)) => count,
                        Err(StoreError::InvalidTransition { from, .. }) => {
                            return Ok(DriveResult::AlreadyResolved(from))
                        }
                        Err(e) => return Err(e.into()),
                    };

                    if self.policy.exhausted(retry_count) {
                        let reason = format!(
                            "{MAX_RETRIES_EXCEEDED} after {retry_count} attempts (last error: {kind}: {message})"
                        );
                        self.finish_failed(record_id, &reason).await?;
                        return Ok(DriveResult::Failed(reason));
                    }

                    let delay = self.policy.backoff(retry_count);
                    warn!(
                        record_id = %record_id,
                        operation = %record.operation,
                        retry_count,
                        kind = %kind,
                        delay_ms = delay.as_millis() as u64,
                        "[sl-03] Transport failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    // =========================================================================
    // TERMINAL TRANSITIONS
    // =========================================================================

    /// Operator transition of a PENDING record to FAILED.
    pub async fn abandon(
        &self,
        record_id: RecordId,
        reason: &str,
    ) -> Result<TransactionRecord, CoordinatorError> {
        let record = self.load(record_id)?;
        if !record.is_pending() {
            return Err(CoordinatorError::NotPending {
                id: record_id,
                status: record.status,
            });
        }
        warn!(record_id = %record_id, reason, "[sl-03] Submission abandoned by operator");
        self.finish_failed(record_id, &format!("abandoned: {reason}"))
            .await
    }

    async fn finish_failed(
        &self,
        record_id: RecordId,
        reason: &str,
    ) -> Result<TransactionRecord, CoordinatorError> {
        let now = self.now();
        let (record, ()) = modify(self.store.as_ref(), record_id, |r| r.fail(reason, now))?;

        warn!(
            record_id = %record_id,
            operation = %record.operation,
            retry_count = record.retry_count,
            reason,
            "[sl-03] Submission failed"
        );
        self.metrics.submission_resolved(record.operation, "failed");

        if let Some(finalizer) = self.finalizers.get(record.operation) {
            if let Err(e) = finalizer.on_failed(&record).await {
                error!(record_id = %record_id, error = %e, "[sl-03] Failure finalizer error");
            }
        }

        self.outcomes.resolve(
            record_id,
            SubmissionOutcome::Failed {
                reason: reason.to_string(),
            },
        );
        Ok(record)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Future resolving with the outcome of `record_id`.
    ///
    /// Redundant records follow the record they piggyback on.
    pub fn outcome(&self, record_id: RecordId) -> Result<OutcomeFuture, CoordinatorError> {
        let mut target = self.load(record_id)?;
        while target.status == TxStatus::Redundant {
            let primary = target
                .redundant_of
                .ok_or(CoordinatorError::NotFound(target.id))?;
            target = self.load(primary)?;
        }

        let receiver = self.outcomes.subscribe(target.id);

        // Re-read after subscribing so a resolution in between is not lost.
        let current = self.load(target.id)?;
        if let Some(outcome) = SubmissionOutcome::from_record(&current) {
            self.outcomes.resolve(current.id, outcome);
        }

        Ok(OutcomeFuture::new(target.id, receiver))
    }

    /// Load a record.
    pub fn record(&self, record_id: RecordId) -> Result<TransactionRecord, CoordinatorError> {
        self.load(record_id)
    }

    fn load(&self, record_id: RecordId) -> Result<TransactionRecord, CoordinatorError> {
        self.store
            .get(record_id)?
            .ok_or(CoordinatorError::NotFound(record_id))
    }

    /// Apply `f` under optimistic concurrency; `Some(status)` if the record
    /// was no longer PENDING.
    fn write<F>(&self, record_id: RecordId, mut f: F) -> Result<Option<TxStatus>, CoordinatorError>
    where
        F: FnMut(&mut TransactionRecord) -> Result<(), StoreError>,
    {
        match modify(self.store.as_ref(), record_id, |r| f(r)) {
            Ok(_) => Ok(None),
            Err(StoreError::InvalidTransition { from, .. }) => Ok(Some(from)),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ReconciliationApi for SubmissionCoordinator {
    async fn confirm(
        &self,
        record_id: RecordId,
        evidence: ConfirmationEvidence,
    ) -> Result<TransactionRecord, CoordinatorError> {
        let now = self.now();
        let hash = evidence.transaction_hash.clone();
        let (record, ()) = modify(self.store.as_ref(), record_id, |r| {
            r.confirm(hash.clone(), evidence.block_number, now)
        })?;

        if record.external_reference.as_ref() != Some(&evidence.transaction_hash) {
            warn!(
                record_id = %record_id,
                stored = ?record.external_reference,
                event_tx = %evidence.transaction_hash,
                "[sl-03] Confirmed by a different transaction than the one accepted"
            );
        }
        info!(
            record_id = %record_id,
            operation = %record.operation,
            tx_hash = %evidence.transaction_hash,
            block = ?evidence.block_number,
            "[sl-03] Submission confirmed"
        );
        self.metrics.submission_resolved(record.operation, "confirmed");

        if let Some(finalizer) = self.finalizers.get(record.operation) {
            if let Err(e) = finalizer.on_confirmed(&record, evidence.event.as_ref()).await {
                error!(record_id = %record_id, error = %e, "[sl-03] Confirmation finalizer error");
            }
        }

        self.outcomes.resolve(
            record_id,
            SubmissionOutcome::Confirmed {
                external_reference: record.external_reference.clone(),
            },
        );
        Ok(record)
    }

    async fn fail_accepted(
        &self,
        record_id: RecordId,
        reason: &str,
    ) -> Result<TransactionRecord, CoordinatorError> {
        self.finish_failed(record_id, &format!("reverted: {reason}"))
            .await
    }

    async fn apply_unmatched(&self, event: &LedgerEvent) -> Result<bool, FinalizerError> {
        let operation = self.binding.operation_for(event.kind);
        match self.finalizers.get(operation) {
            Some(finalizer) => {
                finalizer.on_unmatched(event).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_stale(&self, threshold: Duration) -> Result<Vec<StaleSubmission>, CoordinatorError> {
        let now = self.now();
        let stale: Vec<StaleSubmission> = self
            .store
            .find_pending_older_than(threshold, now)?
            .into_iter()
            .map(|r| StaleSubmission {
                record_id: r.id,
                operation: r.operation,
                age: Duration::from_millis(r.age(now)),
                external_reference: r.external_reference,
                retry_count: r.retry_count,
            })
            .collect();

        for s in &stale {
            warn!(
                record_id = %s.record_id,
                operation = %s.operation,
                age_secs = s.age.as_secs(),
                accepted = s.is_accepted(),
                "[sl-03] Stale pending submission"
            );
        }
        Ok(stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RecordingFinalizer;
    use shared_bus::InMemoryEventBus;
    use shared_types::{ExternalRef, MockTimeSource, ParamValue};
    use sl_01_ledger_client::{
        MockLedgerClient, SimulatedLedger, SupplyChainContract, TransportKind,
    };
    use sl_02_transaction_store::InMemoryTransactionStore;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Harness {
        coordinator: Arc<SubmissionCoordinator>,
        ledger: Arc<MockLedgerClient>,
        store: Arc<InMemoryTransactionStore>,
        time: Arc<MockTimeSource>,
        finalizer: Arc<RecordingFinalizer>,
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(3)
            .with_initial_backoff(Duration::from_millis(1))
            .with_max_backoff(Duration::from_millis(4))
    }

    fn harness_with(finalizer: RecordingFinalizer) -> Harness {
        let ledger = Arc::new(MockLedgerClient::new());
        let store = Arc::new(InMemoryTransactionStore::new());
        let time = Arc::new(MockTimeSource::new(1_000_000));
        let finalizer = Arc::new(finalizer);
        let coordinator = SubmissionCoordinator::new(
            store.clone(),
            ledger.clone(),
            Arc::new(SupplyChainContract::new("0xc0ffee")),
            time.clone(),
            fast_policy(),
        );
        for op in LedgerOperation::ALL {
            coordinator.register_finalizer(op, finalizer.clone());
        }
        Harness {
            coordinator: Arc::new(coordinator),
            ledger,
            store,
            time,
            finalizer,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingFinalizer::default())
    }

    fn status_update(item: u64, status: u64) -> Parameters {
        Parameters::new(vec![ParamValue::Uint(item), ParamValue::Uint(status)])
    }

    async fn resolved(future: OutcomeFuture) -> SubmissionOutcome {
        timeout(Duration::from_millis(500), future)
            .await
            .expect("timeout")
            .expect("outcome")
    }

    #[tokio::test]
    async fn test_accepted_submission_stays_pending_with_reference() {
        let h = harness();
        h.ledger.push_result(Ok(ExternalRef::new("0xabc")));

        let mut handle = h
            .coordinator
            .submit(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();
        handle.driven().await;

        let record = h.coordinator.record(handle.record_id).unwrap();
        assert_eq!(record.status, TxStatus::Pending);
        assert_eq!(record.external_reference, Some(ExternalRef::new("0xabc")));
        assert_eq!(record.retry_count, 0);
        assert_eq!(h.ledger.submit_calls(), 1);
        assert!(handle.outcome.try_outcome().is_none());
    }

    #[tokio::test]
    async fn test_rejection_fails_without_retry() {
        let h = harness();
        h.ledger
            .push_result(Err(SubmissionError::rejected("insufficient funds")));

        let prepared = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();
        let outcome = h.coordinator.outcome(prepared.id()).unwrap();
        let result = h.coordinator.drive(prepared.id()).await.unwrap();

        assert!(matches!(result, DriveResult::Failed(ref r) if r.contains("insufficient funds")));
        assert_eq!(h.ledger.submit_calls(), 1);
        assert!(matches!(resolved(outcome).await, SubmissionOutcome::Failed { .. }));
        assert_eq!(h.finalizer.hooks(), vec!["failed"]);
    }

    #[tokio::test]
    async fn test_retry_bound_stops_exactly_at_max() {
        let h = harness();
        h.ledger
            .fail_always(SubmissionError::transport(TransportKind::Timeout, "no answer"));

        let prepared = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();
        let result = h.coordinator.drive(prepared.id()).await.unwrap();

        let record = h.store.get(prepared.id()).unwrap().unwrap();
        assert!(matches!(result, DriveResult::Failed(_)));
        assert_eq!(record.status, TxStatus::Failed);
        assert_eq!(record.retry_count, 3);
        assert!(record
            .failure_reason
            .as_deref()
            .unwrap_or_default()
            .starts_with(MAX_RETRIES_EXCEEDED));
        assert_eq!(h.ledger.submit_calls(), 3);
    }

    #[tokio::test]
    async fn test_transient_failures_then_acceptance() {
        let h = harness();
        for _ in 0..2 {
            h.ledger.push_result(Err(SubmissionError::transport(
                TransportKind::ConnectionReset,
                "reset",
            )));
        }
        h.ledger.push_result(Ok(ExternalRef::new("0xfeed")));

        let prepared = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();
        let result = h.coordinator.drive(prepared.id()).await.unwrap();

        assert_eq!(result, DriveResult::Accepted(ExternalRef::new("0xfeed")));
        let record = h.store.get(prepared.id()).unwrap().unwrap();
        assert_eq!(record.retry_count, 2);
        assert!(record.is_pending());

        // Identical parameters on every attempt.
        let calls = h.ledger.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, p)| *p == status_update(1, 1)));
    }

    #[tokio::test]
    async fn test_identical_submission_is_redundant() {
        let h = harness();

        let mut first = h
            .coordinator
            .submit(LedgerOperation::UpdateItemStatus, status_update(5, 2))
            .unwrap();
        first.driven().await;
        let second = h
            .coordinator
            .submit(LedgerOperation::UpdateItemStatus, status_update(5, 2))
            .unwrap();

        assert_eq!(second.redundant_of, Some(first.record_id));
        assert!(second.task.is_none());
        assert_eq!(h.ledger.submit_calls(), 1);
        assert_eq!(
            h.store.get(second.record_id).unwrap().unwrap().status,
            TxStatus::Redundant
        );

        let reference = h
            .store
            .get(first.record_id)
            .unwrap()
            .unwrap()
            .external_reference
            .unwrap();
        h.coordinator
            .confirm(
                first.record_id,
                ConfirmationEvidence {
                    transaction_hash: reference,
                    block_number: Some(4),
                    event: None,
                },
            )
            .await
            .unwrap();

        assert!(resolved(first.outcome).await.is_confirmed());
        assert!(resolved(second.outcome).await.is_confirmed());
        // Still REDUNDANT: statuses never move once terminal.
        assert_eq!(
            h.store.get(second.record_id).unwrap().unwrap().status,
            TxStatus::Redundant
        );
    }

    #[tokio::test]
    async fn test_resubmission_after_failure_is_fresh() {
        let h = harness();
        h.ledger.push_result(Err(SubmissionError::rejected("nonce")));

        let first = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();
        h.coordinator.drive(first.id()).await.unwrap();

        let second = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();
        assert!(!second.is_redundant());
    }

    #[tokio::test]
    async fn test_confirm_runs_finalizer_and_is_monotonic() {
        let h = harness();
        let prepared = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();
        h.coordinator.drive(prepared.id()).await.unwrap();
        h.time.advance(5_000);

        let evidence = ConfirmationEvidence {
            transaction_hash: ExternalRef::new("0x01"),
            block_number: Some(2),
            event: None,
        };
        let record = h
            .coordinator
            .confirm(prepared.id(), evidence.clone())
            .await
            .unwrap();

        assert_eq!(record.status, TxStatus::Confirmed);
        assert_eq!(record.confirmed_at, Some(1_005_000));
        assert_eq!(record.block_number, Some(2));
        assert_eq!(h.finalizer.hooks(), vec!["confirmed"]);

        let again = h.coordinator.confirm(prepared.id(), evidence).await;
        assert!(matches!(
            again,
            Err(CoordinatorError::Store(StoreError::InvalidTransition { .. }))
        ));
        assert!(h
            .coordinator
            .fail_accepted(prepared.id(), "late revert")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_confirmation_before_acceptance_is_not_overwritten() {
        let h = harness();
        let prepared = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();

        h.coordinator
            .confirm(
                prepared.id(),
                ConfirmationEvidence {
                    transaction_hash: ExternalRef::new("0xevent"),
                    block_number: Some(1),
                    event: None,
                },
            )
            .await
            .unwrap();

        let result = h.coordinator.drive(prepared.id()).await.unwrap();
        assert_eq!(result, DriveResult::AlreadyResolved(TxStatus::Confirmed));
        assert_eq!(h.ledger.submit_calls(), 0);
        let record = h.store.get(prepared.id()).unwrap().unwrap();
        assert_eq!(record.external_reference, Some(ExternalRef::new("0xevent")));
    }

    #[tokio::test]
    async fn test_finalizer_error_does_not_undo_transition() {
        let h = harness_with(RecordingFinalizer {
            should_fail: true,
            ..RecordingFinalizer::default()
        });
        let prepared = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();

        let record = h
            .coordinator
            .confirm(
                prepared.id(),
                ConfirmationEvidence {
                    transaction_hash: ExternalRef::new("0x02"),
                    block_number: None,
                    event: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(record.status, TxStatus::Confirmed);
        assert_eq!(h.finalizer.hooks(), vec!["confirmed"]);
    }

    #[tokio::test]
    async fn test_abandon_only_pending() {
        let h = harness();
        let prepared = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();

        let record = h
            .coordinator
            .abandon(prepared.id(), "stuck in mempool")
            .await
            .unwrap();
        assert_eq!(record.status, TxStatus::Failed);
        assert_eq!(
            record.failure_reason.as_deref(),
            Some("abandoned: stuck in mempool")
        );

        assert!(matches!(
            h.coordinator.abandon(prepared.id(), "again").await,
            Err(CoordinatorError::NotPending { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_stale_reports_age_and_acceptance() {
        let h = harness();
        let prepared = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();
        h.coordinator.drive(prepared.id()).await.unwrap();

        assert!(h
            .coordinator
            .find_stale(Duration::from_secs(60))
            .await
            .unwrap()
            .is_empty());

        h.time.advance(61_000);
        let stale = h
            .coordinator
            .find_stale(Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].record_id, prepared.id());
        assert!(stale[0].is_accepted());
        assert_eq!(stale[0].age, Duration::from_secs(61));
    }

    #[tokio::test]
    async fn test_outcome_of_already_resolved_record() {
        let h = harness();
        let prepared = h
            .coordinator
            .prepare(LedgerOperation::UpdateItemStatus, status_update(1, 1))
            .unwrap();
        h.coordinator.abandon(prepared.id(), "test").await.unwrap();

        let outcome = h.coordinator.outcome(prepared.id()).unwrap();
        assert!(matches!(
            resolved(outcome).await,
            SubmissionOutcome::Failed { reason } if reason == "abandoned: test"
        ));
    }

    #[tokio::test]
    async fn test_unmatched_event_routed_to_finalizer() {
        let h = harness();
        let event = LedgerEvent {
            kind: shared_types::EventKind::ItemStatusUpdated,
            contract: "0xc0ffee".to_string(),
            fields: Default::default(),
            transaction_hash: ExternalRef::new("0x77"),
            block_number: 1,
            log_index: 0,
        };

        assert!(h.coordinator.apply_unmatched(&event).await.unwrap());
        assert_eq!(h.finalizer.hooks(), vec!["unmatched"]);
    }

    #[tokio::test]
    async fn test_against_simulated_ledger_rejects_malformed() {
        let store = Arc::new(InMemoryTransactionStore::new());
        let binding = Arc::new(SupplyChainContract::new("0xc0ffee"));
        let ledger = Arc::new(SimulatedLedger::new(
            binding.clone(),
            Arc::new(InMemoryEventBus::new()),
        ));
        let coordinator = SubmissionCoordinator::new(
            store.clone(),
            ledger,
            binding,
            Arc::new(MockTimeSource::new(0)),
            fast_policy(),
        );

        let prepared = coordinator
            .prepare(
                LedgerOperation::UpdateItemStatus,
                Parameters::new(vec![ParamValue::text("not-a-number")]),
            )
            .unwrap();
        let result = coordinator.drive(prepared.id()).await.unwrap();

        assert!(matches!(result, DriveResult::Failed(_)));
        assert_eq!(
            store.get(prepared.id()).unwrap().unwrap().status,
            TxStatus::Failed
        );
    }
}
