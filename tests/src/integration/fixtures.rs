//! # Integration Fixtures
//!
//! [`LedgerNetwork`] wires every subsystem in-process around one mock clock.
//! Nothing runs in the background: tests mine blocks and hand the events to
//! the reconciler themselves, so every interleaving is explicit.

use shared_bus::InMemoryEventBus;
use shared_types::{LedgerEvent, MockTimeSource, RecordId};
use sl_01_ledger_client::{
    ContractBinding, LedgerClient, MockLedgerClient, SimulatedLedger, SupplyChainContract,
};
use sl_02_transaction_store::{InMemoryTransactionStore, TransactionRecord, TransactionStore};
use sl_03_submission_coordinator::{RetryPolicy, SubmissionCoordinator};
use sl_04_event_reconciler::{
    EventReconciler, InMemoryCheckpointStore, ReconcileOutcome, ReconcilerApi, ReconcilerConfig,
};
use sl_05_domain_adapters::{
    ChainRegistrationAdapter, ChainRegistrationApi, CreateItemRequest, DomainAdapters, EntityStore,
    InMemoryEntityStore, Item, ItemLifecycleAdapter, ItemLifecycleApi,
};
use std::sync::Arc;
use std::time::Duration;

pub const CONTRACT: &str = "0x5c0ffee000000000000000000000000000000001";
pub const CHAIN: u64 = 7;
pub const OWNER: &str = "0xa11ce";
pub const CARRIER: &str = "0xb0b";

/// Retry budget used by every network.
pub const MAX_RETRIES: u32 = 3;

/// Upper bound on a drive task reaching the ledger, retries included.
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Every subsystem, sharing one set of in-memory stores.
pub struct LedgerNetwork {
    pub time: Arc<MockTimeSource>,
    pub binding: Arc<dyn ContractBinding>,
    /// Simulated ledger; idle when the network was built over a mock client.
    pub ledger: Arc<SimulatedLedger>,
    client: Arc<dyn LedgerClient>,
    pub records: Arc<InMemoryTransactionStore>,
    pub entities: Arc<InMemoryEntityStore>,
    pub checkpoints: Arc<InMemoryCheckpointStore>,
    pub coordinator: Arc<SubmissionCoordinator>,
    pub reconciler: EventReconciler,
    adapters: DomainAdapters,
}

impl LedgerNetwork {
    /// Network over the simulated ledger.
    pub fn new() -> Self {
        let binding: Arc<dyn ContractBinding> = Arc::new(SupplyChainContract::new(CONTRACT));
        let ledger = Arc::new(SimulatedLedger::new(
            Arc::clone(&binding),
            Arc::new(InMemoryEventBus::new()),
        ));
        Self::build(binding, Arc::clone(&ledger) as Arc<dyn LedgerClient>, ledger)
    }

    /// Network whose submissions go to a scripted client instead.
    pub fn scripted(client: Arc<MockLedgerClient>) -> Self {
        let binding: Arc<dyn ContractBinding> = Arc::new(SupplyChainContract::new(CONTRACT));
        let ledger = Arc::new(SimulatedLedger::new(
            Arc::clone(&binding),
            Arc::new(InMemoryEventBus::new()),
        ));
        Self::build(binding, client, ledger)
    }

    fn build(
        binding: Arc<dyn ContractBinding>,
        client: Arc<dyn LedgerClient>,
        ledger: Arc<SimulatedLedger>,
    ) -> Self {
        let time = Arc::new(MockTimeSource::new(1_000_000));
        let records = Arc::new(InMemoryTransactionStore::new());
        let entities = Arc::new(InMemoryEntityStore::new());
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());

        let coordinator = Arc::new(SubmissionCoordinator::new(
            records.clone(),
            Arc::clone(&client),
            Arc::clone(&binding),
            time.clone(),
            RetryPolicy::default()
                .with_max_retries(MAX_RETRIES)
                .with_initial_backoff(Duration::from_millis(1))
                .with_max_backoff(Duration::from_millis(4)),
        ));
        let adapters = DomainAdapters::new(
            Arc::clone(&coordinator),
            entities.clone(),
            time.clone(),
            Duration::from_secs(30),
        );

        let reconciler =
            Self::reconciler_over(&coordinator, &records, &client, &binding, &checkpoints, &time);

        Self {
            time,
            binding,
            ledger,
            client,
            records,
            entities,
            checkpoints,
            coordinator,
            reconciler,
            adapters,
        }
    }

    fn reconciler_over(
        coordinator: &Arc<SubmissionCoordinator>,
        records: &Arc<InMemoryTransactionStore>,
        client: &Arc<dyn LedgerClient>,
        binding: &Arc<dyn ContractBinding>,
        checkpoints: &Arc<InMemoryCheckpointStore>,
        time: &Arc<MockTimeSource>,
    ) -> EventReconciler {
        EventReconciler::new(
            coordinator.clone(),
            records.clone(),
            Arc::clone(client),
            Arc::clone(binding),
            checkpoints.clone(),
            time.clone(),
            ReconcilerConfig::default(),
        )
    }

    /// A fresh reconciler over the same stores and checkpoint, as after a
    /// process restart.
    pub fn restarted_reconciler(&self) -> EventReconciler {
        Self::reconciler_over(
            &self.coordinator,
            &self.records,
            &self.client,
            &self.binding,
            &self.checkpoints,
            &self.time,
        )
    }

    /// A reconciler over the same stores whose checkpoint was lost.
    pub fn amnesiac_reconciler(&self) -> EventReconciler {
        Self::reconciler_over(
            &self.coordinator,
            &self.records,
            &self.client,
            &self.binding,
            &Arc::new(InMemoryCheckpointStore::new()),
            &self.time,
        )
    }

    pub fn chains(&self) -> Arc<ChainRegistrationAdapter> {
        self.adapters.chains()
    }

    pub fn items(&self) -> Arc<ItemLifecycleAdapter> {
        self.adapters.items()
    }

    pub fn record(&self, id: RecordId) -> TransactionRecord {
        self.records.get(id).unwrap().unwrap()
    }

    pub fn item(&self, id: u64) -> Item {
        self.entities.load_item(id).unwrap().unwrap()
    }

    /// Wait until the drive task of `id` has a transaction hash. Retries
    /// back off on the real clock, so this polls rather than yields.
    pub async fn until_accepted(&self, id: RecordId) {
        let accepted = tokio::time::timeout(ACCEPT_TIMEOUT, async {
            while !self.record(id).is_accepted() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        assert!(accepted.is_ok(), "record {id} never accepted");
    }

    /// Mine one block without reconciling it.
    pub async fn mine(&self) -> Vec<LedgerEvent> {
        self.ledger.mine_block().await.events
    }

    /// Feed `events` to the reconciler in the given order.
    pub async fn reconcile(&self, events: &[LedgerEvent]) -> Vec<ReconcileOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            outcomes.push(self.reconciler.handle_event(event).await.unwrap());
        }
        outcomes
    }

    /// Mine one block and reconcile its events in ledger order.
    pub async fn settle(&self) -> Vec<ReconcileOutcome> {
        let events = self.mine().await;
        self.reconcile(&events).await
    }

    /// Wait for `id` to be accepted, then mine and reconcile it.
    pub async fn accept_and_settle(&self, id: RecordId) {
        self.until_accepted(id).await;
        self.settle().await;
        assert!(
            self.record(id).status.is_terminal(),
            "record {id} unresolved after settling"
        );
    }

    /// Confirmed chain owned by [`OWNER`] with [`CARRIER`] authorized.
    pub async fn confirmed_chain(&self) {
        let chain = self.chains().create_chain(CHAIN, "Coffee", OWNER).await.unwrap();
        self.accept_and_settle(chain.record_id).await;

        let grant = self
            .chains()
            .authorize_participant(CHAIN, CARRIER, "carrier", OWNER)
            .await
            .unwrap();
        self.accept_and_settle(grant.record_id).await;
    }

    pub fn create_request(&self, item_id: u64, quantity: u64) -> CreateItemRequest {
        CreateItemRequest {
            item_id,
            supply_chain_id: CHAIN,
            quantity,
            item_type: "raw-material".to_string(),
            owner: OWNER.to_string(),
        }
    }

    /// Confirmed item held entirely by [`OWNER`].
    pub async fn confirmed_item(&self, item_id: u64, quantity: u64) {
        let intent = self
            .items()
            .create_item(self.create_request(item_id, quantity))
            .await
            .unwrap();
        self.accept_and_settle(intent.record_id).await;
    }
}
