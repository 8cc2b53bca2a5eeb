//! # Subsystem Container
//!
//! Builds every subsystem once, in dependency order, and holds the shared
//! instances for the workers and the inbound API.
//!
//! ```text
//! Storage ──┬──→ SubmissionCoordinator (sl-03) ←── SimulatedLedger (sl-01)
//!           │            │                                 │
//!           │            ▼                                 ▼ events
//!           ├──→ DomainAdapters (sl-05)            InMemoryEventBus
//!           │     (registers finalizers)                   │
//!           └──→ EventReconciler (sl-04) ←── subscribe ────┘
//! ```

use crate::adapters::{PrometheusMetrics, Storage};
use crate::container::config::{ConfigError, RuntimeConfig};
use shared_bus::InMemoryEventBus;
use shared_types::{SystemTimeSource, TimeSource};
use sl_01_ledger_client::{ContractBinding, LedgerClient, SimulatedLedger, SupplyChainContract};
use sl_02_transaction_store::TransactionStore;
use sl_03_submission_coordinator::{ReconciliationApi, SubmissionCoordinator};
use sl_04_event_reconciler::EventReconciler;
use sl_05_domain_adapters::{ChainRegistrationAdapter, DomainAdapters, ItemLifecycleAdapter};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Container construction errors.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A storage backend could not be opened.
    #[error("Storage initialization failed: {0}")]
    Storage(String),
}

/// Every subsystem instance of one running service.
pub struct LedgerContainer {
    /// Configuration the container was built from.
    pub config: RuntimeConfig,
    /// Event bus the ledger publishes on.
    pub bus: Arc<InMemoryEventBus>,
    /// Contract binding.
    pub binding: Arc<dyn ContractBinding>,
    /// In-process ledger.
    pub ledger: Arc<SimulatedLedger>,
    /// Persistence ports.
    pub storage: Storage,
    /// Clock shared by every subsystem.
    pub time: Arc<dyn TimeSource>,
    /// Submission coordinator (sl-03).
    pub coordinator: Arc<SubmissionCoordinator>,
    /// Event reconciler (sl-04).
    pub reconciler: Arc<EventReconciler>,
    /// Domain adapters (sl-05).
    pub domain: DomainAdapters,
}

impl LedgerContainer {
    /// Build with the configured storage backend and the system clock.
    pub fn new(config: RuntimeConfig) -> Result<Self, ContainerError> {
        config.validate()?;
        let storage = Storage::open(&config.storage).map_err(ContainerError::Storage)?;
        Ok(Self::with_parts(config, storage, Arc::new(SystemTimeSource)))
    }

    /// Build from explicit storage and clock.
    pub fn with_parts(config: RuntimeConfig, storage: Storage, time: Arc<dyn TimeSource>) -> Self {
        info!(
            contract = %config.ledger.contract_address,
            max_retries = config.submission.max_retries,
            "Initializing subsystems"
        );

        // sl-01: ledger boundary
        let bus = Arc::new(InMemoryEventBus::new());
        let binding: Arc<dyn ContractBinding> =
            Arc::new(SupplyChainContract::new(&config.ledger.contract_address));
        let ledger = Arc::new(SimulatedLedger::new(Arc::clone(&binding), Arc::clone(&bus)));
        let client: Arc<dyn LedgerClient> = Arc::clone(&ledger) as Arc<dyn LedgerClient>;

        // sl-03: coordinator over sl-02 records
        let records: Arc<dyn TransactionStore> = Arc::clone(&storage.records);
        let coordinator = Arc::new(
            SubmissionCoordinator::new(
                Arc::clone(&records),
                Arc::clone(&client),
                Arc::clone(&binding),
                Arc::clone(&time),
                config.submission.retry_policy(),
            )
            .with_metrics(Arc::new(PrometheusMetrics)),
        );

        // sl-05: adapters register their finalizers with the coordinator
        let domain = DomainAdapters::new(
            Arc::clone(&coordinator),
            Arc::clone(&storage.entities),
            Arc::clone(&time),
            config.domain.auth_cache_ttl,
        );

        // sl-04: reconciler drives the coordinator
        let reconciler = Arc::new(
            EventReconciler::new(
                Arc::clone(&coordinator) as Arc<dyn ReconciliationApi>,
                records,
                client,
                Arc::clone(&binding),
                Arc::clone(&storage.checkpoints),
                Arc::clone(&time),
                config.reconciler.reconciler_config(),
            )
            .with_metrics(Arc::new(PrometheusMetrics)),
        );

        info!("All subsystems initialized");

        Self {
            config,
            bus,
            binding,
            ledger,
            storage,
            time,
            coordinator,
            reconciler,
            domain,
        }
    }

    /// Chain registration API.
    pub fn chains(&self) -> Arc<ChainRegistrationAdapter> {
        self.domain.chains()
    }

    /// Item lifecycle API.
    pub fn items(&self) -> Arc<ItemLifecycleAdapter> {
        self.domain.items()
    }
}
