//! # Submission Outcomes
//!
//! Callers that want to know how a submission ended await an
//! [`OutcomeFuture`]; everyone else ignores it. Resolution happens only on
//! CONFIRMED or FAILED.
//!
//! One `watch` channel per awaited record, created on first interest and
//! dropped once resolved.

use super::errors::CoordinatorError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{ExternalRef, RecordId, TxStatus};
use sl_02_transaction_store::TransactionRecord;
use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use tokio::sync::watch;

/// Terminal result of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    /// The ledger executed the call.
    Confirmed {
        /// Hash of the confirming transaction.
        external_reference: Option<ExternalRef>,
    },
    /// The ledger never applied the call.
    Failed {
        /// Diagnostic.
        reason: String,
    },
}

impl SubmissionOutcome {
    /// Outcome implied by a stored record, if it is resolved.
    pub fn from_record(record: &TransactionRecord) -> Option<Self> {
        match record.status {
            TxStatus::Confirmed => Some(SubmissionOutcome::Confirmed {
                external_reference: record.external_reference.clone(),
            }),
            TxStatus::Failed => Some(SubmissionOutcome::Failed {
                reason: record.failure_reason.clone().unwrap_or_default(),
            }),
            TxStatus::Pending | TxStatus::Redundant => None,
        }
    }

    /// True for `Confirmed`.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SubmissionOutcome::Confirmed { .. })
    }
}

type OutcomeSlot = Option<SubmissionOutcome>;

/// Per-record outcome channels.
#[derive(Debug, Default)]
pub struct OutcomeRegistry {
    channels: Mutex<HashMap<RecordId, watch::Sender<OutcomeSlot>>>,
}

impl OutcomeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Receiver for `id`, creating the channel on first interest.
    pub fn subscribe(&self, id: RecordId) -> watch::Receiver<OutcomeSlot> {
        self.channels
            .lock()
            .entry(id)
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// Publish the outcome of `id` and forget the channel.
    pub fn resolve(&self, id: RecordId, outcome: SubmissionOutcome) {
        if let Some(sender) = self.channels.lock().remove(&id) {
            sender.send_replace(Some(outcome));
        }
    }

    /// Records currently awaited.
    pub fn tracked(&self) -> usize {
        self.channels.lock().len()
    }
}

/// Resolves with the outcome of one submission.
///
/// `.await` it directly, or drop it.
#[derive(Debug)]
pub struct OutcomeFuture {
    record_id: RecordId,
    receiver: watch::Receiver<OutcomeSlot>,
}

impl OutcomeFuture {
    pub(crate) fn new(record_id: RecordId, receiver: watch::Receiver<OutcomeSlot>) -> Self {
        Self {
            record_id,
            receiver,
        }
    }

    /// Record whose outcome this is (the primary, for redundant submissions).
    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    /// Outcome if already resolved.
    pub fn try_outcome(&self) -> Option<SubmissionOutcome> {
        self.receiver.borrow().clone()
    }

    /// Wait for the outcome.
    pub async fn wait(mut self) -> Result<SubmissionOutcome, CoordinatorError> {
        loop {
            if let Some(outcome) = self.receiver.borrow_and_update().clone() {
                return Ok(outcome);
            }
            if self.receiver.changed().await.is_err() {
                return self
                    .receiver
                    .borrow()
                    .clone()
                    .ok_or(CoordinatorError::OutcomeUnavailable(self.record_id));
            }
        }
    }
}

impl IntoFuture for OutcomeFuture {
    type Output = Result<SubmissionOutcome, CoordinatorError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
