//! # Event Reconciler Service
//!
//! Consumes ledger events in delivery order and turns them into record
//! confirmations through the coordinator.
//!
//! ## Matching
//!
//! ```text
//! event ──binding──→ (operation, match key)
//!   │
//!   ├─ position <= checkpoint ───────────────────────→ Duplicate
//!   ├─ PENDING records, same op + key, in lookback:
//!   │     ref == tx hash ? that one : oldest ─confirm─→ Confirmed
//!   ├─ record carrying tx hash:
//!   │     PENDING (outside window) ──confirm──────────→ Confirmed
//!   │     terminal ───────────────────────────────────→ Duplicate
//!   └─ otherwise ──finalizer.on_unmatched─────────────→ Unmatched
//! ```
//!
//! Errors are per event: logged, counted, parked in the dead letter queue.
//! The loop never stops on one.

use crate::domain::{
    ReconcileError, ReconcileOutcome, ReconcilerConfig, ReconcilerStats, RecoveryReport,
};
use crate::ports::{CheckpointStore, NoopReconcilerMetrics, ReconcilerApi, ReconcilerMetrics};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{DeadLetterQueue, EventFilter};
use shared_types::{ExternalRef, LedgerEvent, TimeSource};
use sl_01_ledger_client::{ContractBinding, LedgerClient, LedgerEventStream, Receipt};
use sl_02_transaction_store::{StoreError, TransactionRecord, TransactionStore};
use sl_03_submission_coordinator::{ConfirmationEvidence, CoordinatorError, ReconciliationApi};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Event Reconciler.
pub struct EventReconciler {
    coordinator: Arc<dyn ReconciliationApi>,
    store: Arc<dyn TransactionStore>,
    ledger: Arc<dyn LedgerClient>,
    binding: Arc<dyn ContractBinding>,
    checkpoints: Arc<dyn CheckpointStore>,
    time: Arc<dyn TimeSource>,
    config: ReconcilerConfig,
    dead_letters: DeadLetterQueue,
    metrics: Arc<dyn ReconcilerMetrics>,
    stats: Mutex<ReconcilerStats>,
}

impl EventReconciler {
    /// Create a reconciler.
    pub fn new(
        coordinator: Arc<dyn ReconciliationApi>,
        store: Arc<dyn TransactionStore>,
        ledger: Arc<dyn LedgerClient>,
        binding: Arc<dyn ContractBinding>,
        checkpoints: Arc<dyn CheckpointStore>,
        time: Arc<dyn TimeSource>,
        config: ReconcilerConfig,
    ) -> Self {
        let dead_letters = DeadLetterQueue::new(config.dead_letter_capacity);
        Self {
            coordinator,
            store,
            ledger,
            binding,
            checkpoints,
            time,
            config,
            dead_letters,
            metrics: Arc::new(NoopReconcilerMetrics),
            stats: Mutex::new(ReconcilerStats::default()),
        }
    }

    /// Report to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn ReconcilerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Events that could not be reconciled.
    pub fn dead_letters(&self) -> &DeadLetterQueue {
        &self.dead_letters
    }

    /// Configuration in force.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    // =========================================================================
    // EVENT LOOP
    // =========================================================================

    /// [`open_stream`](Self::open_stream), then [`consume`](Self::consume).
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), ReconcileError> {
        let stream = self.open_stream().await?;
        self.consume(stream, shutdown).await;
        Ok(())
    }

    /// Subscribe from the checkpoint block (inclusive), or from the latest
    /// block when there is no checkpoint.
    pub async fn open_stream(&self) -> Result<LedgerEventStream, ReconcileError> {
        let mut filter = EventFilter::contract(self.binding.address());
        match self.checkpoints.load()? {
            Some(checkpoint) => {
                info!(
                    block = checkpoint.block_number,
                    log_index = checkpoint.log_index,
                    "[sl-04] Resuming from checkpoint"
                );
                filter = filter.from_block(checkpoint.block_number);
            }
            None => info!("[sl-04] No checkpoint, starting from latest block"),
        }

        Ok(self.ledger.subscribe(filter).await?)
    }

    /// Reconcile every event of `stream` until `shutdown` flips or the
    /// stream ends.
    pub async fn consume(&self, mut stream: LedgerEventStream, mut shutdown: watch::Receiver<bool>) {
        info!(contract = self.binding.address(), "[sl-04] Event reconciler started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("[sl-04] Shutdown signal received");
                    break;
                }
                next = stream.next() => match next {
                    Some(event) => {
                        self.process(&event).await;
                    }
                    None => {
                        warn!("[sl-04] Event stream ended");
                        break;
                    }
                }
            }
        }
    }

    /// Handle one event, absorbing any error.
    pub async fn process(&self, event: &LedgerEvent) -> Option<ReconcileOutcome> {
        match self.handle_event(event).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(
                    kind = %event.kind,
                    tx_hash = %event.transaction_hash,
                    block = event.block_number,
                    log_index = event.log_index,
                    error = %e,
                    "[sl-04] Failed to reconcile ledger event"
                );
                self.stats.lock().errors += 1;
                self.metrics.reconciliation_error(event.kind);
                self.dead_letters
                    .push(event.clone(), e.to_string(), self.time.now());
                // Parked in the dead letter queue; do not replay it on restart.
                if let Err(e) = self.advance_checkpoint(event) {
                    error!(error = %e, "[sl-04] Failed to save checkpoint");
                }
                None
            }
        }
    }

    fn advance_checkpoint(&self, event: &LedgerEvent) -> Result<(), ReconcileError> {
        let position = event.position();
        match self.checkpoints.load()? {
            Some(current) if current >= position => Ok(()),
            _ => self.checkpoints.save(position),
        }
    }

    async fn reconcile(&self, event: &LedgerEvent) -> Result<ReconcileOutcome, ReconcileError> {
        if let Some(checkpoint) = self.checkpoints.load()? {
            if event.position() <= checkpoint {
                debug!(
                    tx_hash = %event.transaction_hash,
                    block = event.block_number,
                    log_index = event.log_index,
                    "[sl-04] Event at or below checkpoint, skipping"
                );
                return Ok(ReconcileOutcome::Duplicate);
            }
        }

        if !event.contract.eq_ignore_ascii_case(self.binding.address()) {
            debug!(contract = %event.contract, "[sl-04] Event from foreign contract ignored");
            return Ok(ReconcileOutcome::Ignored);
        }

        let (operation, match_key) = self.binding.event_match_key(event)?;
        let lookback = self.config.lookback_window.as_millis() as u64;
        let since = self.time.now().saturating_sub(lookback);

        let candidates = self
            .store
            .find_pending_by_match_key(operation, &match_key, since)?;
        let mut chosen = candidates
            .iter()
            .find(|r| r.external_reference.as_ref() == Some(&event.transaction_hash))
            .or_else(|| candidates.first())
            .cloned();

        if chosen.is_none() {
            match self.store.find_by_external_ref(&event.transaction_hash)? {
                Some(record) if record.is_pending() => chosen = Some(record),
                Some(record) => {
                    debug!(
                        record_id = %record.id,
                        status = %record.status,
                        tx_hash = %event.transaction_hash,
                        "[sl-04] Event already applied"
                    );
                    return Ok(ReconcileOutcome::Duplicate);
                }
                None => {}
            }
        }

        if let Some(record) = chosen {
            return self
                .confirm(&record, ConfirmationEvidence::from_event(event))
                .await;
        }

        if self.coordinator.apply_unmatched(event).await? {
            warn!(
                kind = %event.kind,
                operation = %operation,
                tx_hash = %event.transaction_hash,
                block = event.block_number,
                "[sl-04] unmatched ledger event"
            );
            Ok(ReconcileOutcome::Unmatched)
        } else {
            warn!(
                kind = %event.kind,
                tx_hash = %event.transaction_hash,
                "[sl-04] unmatched ledger event with no finalizer, ignored"
            );
            Ok(ReconcileOutcome::Ignored)
        }
    }

    async fn confirm(
        &self,
        record: &TransactionRecord,
        evidence: ConfirmationEvidence,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match self.coordinator.confirm(record.id, evidence).await {
            Ok(_) => Ok(ReconcileOutcome::Confirmed {
                record_id: record.id,
            }),
            // Resolved concurrently, e.g. by receipt recovery.
            Err(CoordinatorError::Store(StoreError::InvalidTransition { from, .. })) => {
                debug!(record_id = %record.id, status = %from, "[sl-04] Record already resolved");
                Ok(ReconcileOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // RECEIPT RECOVERY
    // =========================================================================

    async fn recover_one(
        &self,
        record: &TransactionRecord,
        reference: &ExternalRef,
        receipt: Receipt,
        report: &mut RecoveryReport,
    ) -> Result<(), ReconcileError> {
        if receipt.is_success() {
            let event = receipt.events.iter().find(|e| {
                self.binding
                    .event_match_key(e)
                    .map(|(op, key)| op == record.operation && key == record.match_key)
                    .unwrap_or(false)
            });
            let evidence = match event {
                Some(event) => ConfirmationEvidence::from_event(event),
                None => ConfirmationEvidence {
                    transaction_hash: reference.clone(),
                    block_number: Some(receipt.block_number),
                    event: None,
                },
            };
            if let ReconcileOutcome::Confirmed { record_id } = self.confirm(record, evidence).await? {
                info!(record_id = %record_id, tx_hash = %reference, "[sl-04] Stale record confirmed from receipt");
                report.confirmed.push(record_id);
            }
        } else {
            let reason = receipt
                .revert_reason
                .unwrap_or_else(|| "execution reverted".to_string());
            match self.coordinator.fail_accepted(record.id, &reason).await {
                Ok(_) => {
                    warn!(record_id = %record.id, tx_hash = %reference, reason = %reason, "[sl-04] Stale record reverted on ledger");
                    report.reverted.push(record.id);
                }
                Err(CoordinatorError::Store(StoreError::InvalidTransition { .. })) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ReconcilerApi for EventReconciler {
    async fn handle_event(&self, event: &LedgerEvent) -> Result<ReconcileOutcome, ReconcileError> {
        self.stats.lock().events_seen += 1;

        let outcome = self.reconcile(event).await?;
        self.advance_checkpoint(event)?;

        self.stats.lock().count(&outcome);
        self.metrics.event_reconciled(event.kind, outcome.as_str());
        Ok(outcome)
    }

    async fn recover_stale(&self, threshold: Duration) -> Result<RecoveryReport, ReconcileError> {
        let stale = self.coordinator.find_stale(threshold).await?;
        self.metrics.stale_pending(stale.len());

        let mut report = RecoveryReport {
            stale: stale.len(),
            ..RecoveryReport::default()
        };

        for submission in stale {
            let Some(reference) = submission.external_reference else {
                report.not_accepted += 1;
                continue;
            };
            let Some(receipt) = self.ledger.receipt(&reference).await? else {
                report.still_pending += 1;
                continue;
            };
            let Some(record) = self.store.get(submission.record_id)? else {
                continue;
            };
            self.recover_one(&record, &reference, receipt, &mut report)
                .await?;
        }

        {
            let mut stats = self.stats.lock();
            stats.recovered += report.confirmed.len() as u64;
            stats.reverted += report.reverted.len() as u64;
        }
        if report.stale > 0 {
            info!(
                stale = report.stale,
                confirmed = report.confirmed.len(),
                reverted = report.reverted.len(),
                still_pending = report.still_pending,
                not_accepted = report.not_accepted,
                "[sl-04] Receipt recovery pass complete"
            );
        }
        Ok(report)
    }

    fn stats(&self) -> ReconcilerStats {
        self.stats.lock().clone()
    }
}
