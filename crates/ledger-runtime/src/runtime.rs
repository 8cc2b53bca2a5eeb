//! # Ledger Runtime
//!
//! Owns the container and the background workers.
//!
//! ## Startup Sequence
//!
//! 1. Build the container (storage, ledger, coordinator, adapters, reconciler)
//! 2. Open the reconciler's event stream from the checkpoint
//! 3. Spawn the reconciler, the staleness monitor and the block producer
//! 4. Signal ready
//!
//! ## Shutdown Sequence
//!
//! 1. Flip the watch channel
//! 2. Wait (bounded) for every worker to return

use crate::container::{ContainerError, LedgerContainer, RuntimeConfig};
use crate::handlers::{BlockProducer, StalenessMonitor};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use sl_04_event_reconciler::ReconcilerApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Upper bound on waiting for workers at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The running service.
pub struct LedgerRuntime {
    /// Subsystem container with all initialized services.
    container: Arc<LedgerContainer>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
    /// Spawned workers.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl LedgerRuntime {
    /// Build the container from `config`.
    pub fn new(config: RuntimeConfig) -> Result<Self, ContainerError> {
        info!("Creating supply-ledger runtime");
        Ok(Self::from_container(LedgerContainer::new(config)?))
    }

    /// Run an already built container.
    pub fn from_container(container: LedgerContainer) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            container: Arc::new(container),
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start the background workers.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Supply Ledger Runtime v{}", crate::VERSION);
        info!("===========================================");

        let container = Arc::clone(&self.container);
        let config = &container.config;

        // Subscribe before any worker runs so no event is published unseen.
        let stream = container
            .reconciler
            .open_stream()
            .await
            .context("Failed to subscribe to ledger events")?;

        let reconciler = Arc::clone(&container.reconciler);
        let shutdown = self.shutdown_rx.clone();
        let reconciler_task = tokio::spawn(async move {
            reconciler.consume(stream, shutdown).await;
        });

        let monitor = StalenessMonitor::new(
            Arc::clone(&container.reconciler) as Arc<dyn ReconcilerApi>,
            config.reconciler.stale_threshold,
            config.reconciler.stale_scan_interval,
        );
        let monitor_task = tokio::spawn(monitor.run(self.shutdown_rx.clone()));

        let producer = BlockProducer::new(Arc::clone(&container.ledger), config.ledger.block_interval);
        let producer_task = tokio::spawn(producer.run(self.shutdown_rx.clone()));

        self.tasks
            .lock()
            .extend([reconciler_task, monitor_task, producer_task]);

        info!(
            contract = %config.ledger.contract_address,
            storage = ?config.storage.backend,
            "All workers started"
        );
        Ok(())
    }

    /// Shutdown gracefully.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Worker ended abnormally"),
                Err(_) => warn!("Worker did not stop within the grace period"),
            }
        }

        let stats = self.container.reconciler.stats();
        info!(
            events_seen = stats.events_seen,
            confirmed = stats.confirmed,
            unmatched = stats.unmatched,
            errors = stats.errors,
            dead_letters = self.container.reconciler.dead_letters().len(),
            "Shutdown complete"
        );
    }

    /// Get a reference to the subsystem container.
    pub fn container(&self) -> Arc<LedgerContainer> {
        Arc::clone(&self.container)
    }
}
