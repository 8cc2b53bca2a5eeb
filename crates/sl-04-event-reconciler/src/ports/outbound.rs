//! # Outbound Ports
//!
//! Checkpoint persistence and the metrics sink. The ledger, the record
//! store and the coordinator come from their own crates.

use crate::domain::ReconcileError;
use shared_types::{EventKind, EventPosition};

/// Last processed event position.
///
/// Saved after every handled event so a restart resumes where the previous
/// run stopped instead of at the chain head.
pub trait CheckpointStore: Send + Sync {
    /// Stored position, `None` before the first event.
    fn load(&self) -> Result<Option<EventPosition>, ReconcileError>;

    /// Persist `position`.
    fn save(&self, position: EventPosition) -> Result<(), ReconcileError>;
}

/// Metrics sink for reconciliation.
pub trait ReconcilerMetrics: Send + Sync {
    /// One event handled.
    fn event_reconciled(&self, kind: EventKind, outcome: &'static str);

    /// One event raised an error.
    fn reconciliation_error(&self, kind: EventKind);

    /// PENDING records past the staleness threshold at the last scan.
    fn stale_pending(&self, count: usize);
}

/// Metrics sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReconcilerMetrics;

impl ReconcilerMetrics for NoopReconcilerMetrics {
    fn event_reconciled(&self, _kind: EventKind, _outcome: &'static str) {}

    fn reconciliation_error(&self, _kind: EventKind) {}

    fn stale_pending(&self, _count: usize) {}
}
