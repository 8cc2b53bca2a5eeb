//! Reconciler configuration, per-event outcomes, and counters.

use serde::{Deserialize, Serialize};
use shared_types::RecordId;
use std::time::Duration;

/// Reconciler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// How far back a PENDING record may have been created and still match.
    pub lookback_window: Duration,
    /// Retained unreconcilable events.
    pub dead_letter_capacity: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            lookback_window: Duration::from_secs(24 * 60 * 60),
            dead_letter_capacity: 1_000,
        }
    }
}

/// What handling one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileOutcome {
    /// A PENDING record was confirmed.
    Confirmed {
        /// The confirmed record.
        record_id: RecordId,
    },
    /// No record matched; the event was applied heuristically.
    Unmatched,
    /// Already applied (replay, or a terminal record carries the hash).
    Duplicate,
    /// Not ours, or nothing handles its operation.
    Ignored,
}

impl ReconcileOutcome {
    /// Label for logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Confirmed { .. } => "confirmed",
            ReconcileOutcome::Unmatched => "unmatched",
            ReconcileOutcome::Duplicate => "duplicate",
            ReconcileOutcome::Ignored => "ignored",
        }
    }
}

/// Counters since start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerStats {
    /// Events handed to the reconciler.
    pub events_seen: u64,
    /// Events that confirmed a record.
    pub confirmed: u64,
    /// Events applied without a record.
    pub unmatched: u64,
    /// Replays and already-applied events.
    pub duplicates: u64,
    /// Foreign or unhandled events.
    pub ignored: u64,
    /// Events that raised an error.
    pub errors: u64,
    /// Records confirmed from receipts.
    pub recovered: u64,
    /// Records failed from reverted receipts.
    pub reverted: u64,
}

impl ReconcilerStats {
    pub(crate) fn count(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Confirmed { .. } => self.confirmed += 1,
            ReconcileOutcome::Unmatched => self.unmatched += 1,
            ReconcileOutcome::Duplicate => self.duplicates += 1,
            ReconcileOutcome::Ignored => self.ignored += 1,
        }
    }
}

/// Result of one receipt recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Stale PENDING records found.
    pub stale: usize,
    /// Stale records never accepted (nothing to look up).
    pub not_accepted: usize,
    /// Accepted but not mined yet.
    pub still_pending: usize,
    /// Confirmed from a successful receipt.
    pub confirmed: Vec<RecordId>,
    /// Failed from a reverted receipt.
    pub reverted: Vec<RecordId>,
}
