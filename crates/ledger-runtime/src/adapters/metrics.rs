//! Prometheus sink for the coordinator and reconciler metric ports.

use ledger_telemetry::{
    EVENTS_RECONCILED, RECONCILIATION_ERRORS, REDUNDANT_SUBMISSIONS, STALE_PENDING,
    SUBMISSIONS_RESOLVED, TRANSPORT_FAILURES,
};
use shared_types::{EventKind, LedgerOperation};
use sl_03_submission_coordinator::CoordinatorMetrics;
use sl_04_event_reconciler::ReconcilerMetrics;

/// Writes subsystem metrics into the global Prometheus registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl CoordinatorMetrics for PrometheusMetrics {
    fn submission_resolved(&self, operation: LedgerOperation, outcome: &'static str) {
        SUBMISSIONS_RESOLVED
            .with_label_values(&[operation.name(), outcome])
            .inc();
    }

    fn transport_failure(&self, operation: LedgerOperation) {
        TRANSPORT_FAILURES
            .with_label_values(&[operation.name()])
            .inc();
    }

    fn redundant_submission(&self, operation: LedgerOperation) {
        REDUNDANT_SUBMISSIONS
            .with_label_values(&[operation.name()])
            .inc();
    }
}

impl ReconcilerMetrics for PrometheusMetrics {
    fn event_reconciled(&self, kind: EventKind, outcome: &'static str) {
        EVENTS_RECONCILED
            .with_label_values(&[&kind.to_string(), outcome])
            .inc();
    }

    fn reconciliation_error(&self, kind: EventKind) {
        RECONCILIATION_ERRORS
            .with_label_values(&[&kind.to_string()])
            .inc();
    }

    fn stale_pending(&self, count: usize) {
        STALE_PENDING.set(count as f64);
    }
}
