//! Ledger-facing state carried by every business entity.
//!
//! ```text
//! NONE ──pending()──→ PENDING ──confirm()──→ CONFIRMED
//!                        │
//!                        └──fail()──→ FAILED
//! ```

use serde::{Deserialize, Serialize};
use shared_types::{ExternalRef, LedgerStatus, RecordId};

/// Mirror of the owning `TransactionRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// `None` until a submission exists.
    pub ledger_status: Option<LedgerStatus>,
    /// Transaction hash, once known.
    pub external_reference: Option<ExternalRef>,
    /// Owning record.
    pub record_id: Option<RecordId>,
}

impl LedgerState {
    /// Optimistic state written with the intent.
    pub fn pending(record_id: RecordId) -> Self {
        Self {
            ledger_status: Some(LedgerStatus::Pending),
            external_reference: None,
            record_id: Some(record_id),
        }
    }

    /// State of an entity learnt from the ledger itself.
    pub fn confirmed(reference: ExternalRef) -> Self {
        Self {
            ledger_status: Some(LedgerStatus::Confirmed),
            external_reference: Some(reference),
            record_id: None,
        }
    }

    /// The ledger executed the mutation.
    pub fn confirm(&mut self, reference: Option<ExternalRef>) {
        self.ledger_status = Some(LedgerStatus::Confirmed);
        if self.external_reference.is_none() {
            self.external_reference = reference;
        }
    }

    /// The ledger never applied the mutation.
    pub fn fail(&mut self) {
        self.ledger_status = Some(LedgerStatus::Failed);
    }

    /// True while awaiting the ledger.
    pub fn is_pending(&self) -> bool {
        self.ledger_status == Some(LedgerStatus::Pending)
    }

    /// True once confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.ledger_status == Some(LedgerStatus::Confirmed)
    }

    /// True once failed.
    pub fn is_failed(&self) -> bool {
        self.ledger_status == Some(LedgerStatus::Failed)
    }

    /// True when `record_id` owns this state.
    pub fn is_owned_by(&self, record_id: RecordId) -> bool {
        self.record_id == Some(record_id)
    }

    /// Persisted string, `NONE` when absent.
    pub fn status_str(&self) -> &'static str {
        self.ledger_status.map_or("NONE", LedgerStatus::as_str)
    }
}
