//! # Inbound Ports
//!
//! What the runtime drives: per-event handling, receipt recovery, counters.

use crate::domain::{ReconcileError, ReconcileOutcome, ReconcilerStats, RecoveryReport};
use async_trait::async_trait;
use shared_types::LedgerEvent;
use std::time::Duration;

/// Event reconciliation API - inbound port.
#[async_trait]
pub trait ReconcilerApi: Send + Sync {
    /// Match one event to a PENDING record and confirm it, or apply it
    /// heuristically.
    async fn handle_event(&self, event: &LedgerEvent) -> Result<ReconcileOutcome, ReconcileError>;

    /// Resolve stale accepted records from their receipts.
    async fn recover_stale(&self, threshold: Duration) -> Result<RecoveryReport, ReconcileError>;

    /// Counters since start.
    fn stats(&self) -> ReconcilerStats;
}
