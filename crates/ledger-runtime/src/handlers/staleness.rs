//! # Staleness Monitor
//!
//! Periodically looks for PENDING records older than the threshold and
//! tries to resolve accepted ones from their receipts. Records are never
//! cancelled or resubmitted here.

use sl_04_event_reconciler::{ReconcileError, ReconcilerApi, RecoveryReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Periodic stale-record scan.
pub struct StalenessMonitor {
    reconciler: Arc<dyn ReconcilerApi>,
    threshold: Duration,
    interval: Duration,
}

impl StalenessMonitor {
    /// Scan every `interval` for records PENDING longer than `threshold`.
    pub fn new(reconciler: Arc<dyn ReconcilerApi>, threshold: Duration, interval: Duration) -> Self {
        Self {
            reconciler,
            threshold,
            interval,
        }
    }

    /// One scan and recovery pass.
    pub async fn scan_once(&self) -> Result<RecoveryReport, ReconcileError> {
        let report = self.reconciler.recover_stale(self.threshold).await?;
        let unresolved = report
            .stale
            .saturating_sub(report.confirmed.len() + report.reverted.len());
        if unresolved > 0 {
            warn!(
                stale = report.stale,
                unresolved,
                not_accepted = report.not_accepted,
                still_pending = report.still_pending,
                threshold_secs = self.threshold.as_secs(),
                "[sl-04] Stale PENDING submissions need attention"
            );
        }
        Ok(report)
    }

    /// Scan until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            threshold_secs = self.threshold.as_secs(),
            "[sl-04] Staleness monitor started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("[sl-04] Staleness monitor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.scan_once().await {
                        error!(error = %e, "[sl-04] Staleness scan failed");
                    }
                }
            }
        }
    }
}
