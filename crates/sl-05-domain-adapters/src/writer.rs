//! # Intent Writer
//!
//! The unit of work shared by every adapter method:
//!
//! ```text
//! lock ─→ validate ─→ prepare record ─→ optimistic write ─→ unlock ─→ dispatch
//! ```
//!
//! Redundant submissions skip the write; the in-flight record already did it.
//! If the write fails the prepared record is abandoned so it never reaches
//! the ledger.

use crate::domain::{DomainError, EntityKey, PendingIntent};
use parking_lot::{Mutex, MutexGuard};
use shared_types::{LedgerOperation, Parameters, RecordId};
use sl_03_submission_coordinator::{PreparedSubmission, SubmissionCoordinator};
use std::sync::Arc;
use tracing::{debug, warn};

/// Serializes entity read-modify-write between adapters and finalizers.
pub type EntityLock = Arc<Mutex<()>>;

/// Prepares, writes and dispatches intents.
#[derive(Clone)]
pub struct IntentWriter {
    coordinator: Arc<SubmissionCoordinator>,
    lock: EntityLock,
}

impl IntentWriter {
    /// Writer sharing `lock` with the finalizers.
    pub fn new(coordinator: Arc<SubmissionCoordinator>, lock: EntityLock) -> Self {
        Self { coordinator, lock }
    }

    /// Coordinator in use.
    pub fn coordinator(&self) -> &Arc<SubmissionCoordinator> {
        &self.coordinator
    }

    /// Hold the entity lock.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// Prepare a record without writing anything.
    pub fn prepare(
        &self,
        operation: LedgerOperation,
        parameters: Parameters,
    ) -> Result<PreparedSubmission, DomainError> {
        Ok(self.coordinator.prepare(operation, parameters)?)
    }

    /// Prepare a record and run `write` with its id unless it is redundant.
    pub fn stage<F>(
        &self,
        operation: LedgerOperation,
        parameters: Parameters,
        write: F,
    ) -> Result<PreparedSubmission, DomainError>
    where
        F: FnOnce(RecordId) -> Result<(), DomainError>,
    {
        let prepared = self.prepare(operation, parameters)?;
        if prepared.is_redundant() {
            debug!(
                record_id = %prepared.id(),
                redundant_of = ?prepared.redundant_of(),
                "[sl-05] Repeated intent, optimistic write skipped"
            );
            return Ok(prepared);
        }
        if let Err(e) = write(prepared.id()) {
            self.orphan(&[prepared.id()], &e);
            return Err(e);
        }
        Ok(prepared)
    }

    /// Hand a staged record to the coordinator.
    pub fn dispatch(
        &self,
        entity: EntityKey,
        prepared: PreparedSubmission,
    ) -> Result<PendingIntent, DomainError> {
        let handle = self.coordinator.dispatch(prepared)?;
        Ok(PendingIntent {
            entity,
            record_id: handle.record_id,
            redundant_of: handle.redundant_of,
            outcome: handle.outcome,
        })
    }

    /// Abandon prepared records whose optimistic write failed.
    pub fn orphan(&self, record_ids: &[RecordId], error: &DomainError) {
        for &record_id in record_ids {
            let coordinator = Arc::clone(&self.coordinator);
            let reason = format!("entity write failed: {error}");
            warn!(record_id = %record_id, error = %error, "[sl-05] Abandoning prepared submission");
            tokio::spawn(async move {
                if let Err(e) = coordinator.abandon(record_id, &reason).await {
                    warn!(record_id = %record_id, error = %e, "[sl-05] Abandon failed");
                }
            });
        }
    }
}
