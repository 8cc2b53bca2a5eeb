//! # Block Producer
//!
//! Mines the simulated ledger's pending pool on a fixed interval so that
//! accepted calls execute and emit events.

use sl_01_ledger_client::{MinedBlock, SimulatedLedger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Interval miner for the simulated ledger.
pub struct BlockProducer {
    ledger: Arc<SimulatedLedger>,
    interval: Duration,
}

impl BlockProducer {
    /// Mine every `interval`.
    pub fn new(ledger: Arc<SimulatedLedger>, interval: Duration) -> Self {
        Self { ledger, interval }
    }

    /// Mine one block if any call is waiting.
    pub async fn produce_once(&self) -> Option<MinedBlock> {
        if self.ledger.pending_count() == 0 {
            return None;
        }
        Some(self.ledger.mine_block().await)
    }

    /// Mine until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "[sl-01] Block producer started");
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("[sl-01] Block producer stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.produce_once().await;
                }
            }
        }
    }
}
