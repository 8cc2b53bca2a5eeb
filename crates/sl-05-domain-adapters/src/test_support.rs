//! Shared fixtures for the unit tests.

use crate::adapters::InMemoryEntityStore;
use crate::chain_registration::ChainRegistrationAdapter;
use crate::domain::CreateItemRequest;
use crate::item_lifecycle::ItemLifecycleAdapter;
use crate::ports::{ChainRegistrationApi, EntityStore, ItemLifecycleApi};
use crate::service::DomainAdapters;
use crate::writer::EntityLock;
use shared_types::{EventKind, ExternalRef, LedgerEvent, MockTimeSource, ParamValue, RecordId};
use sl_01_ledger_client::{MockLedgerClient, SupplyChainContract};
use sl_02_transaction_store::InMemoryTransactionStore;
use sl_03_submission_coordinator::{
    ConfirmationEvidence, ReconciliationApi, RetryPolicy, SubmissionCoordinator,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) struct Harness {
    pub coordinator: Arc<SubmissionCoordinator>,
    pub ledger: Arc<MockLedgerClient>,
    pub records: Arc<InMemoryTransactionStore>,
    pub entities: Arc<InMemoryEntityStore>,
    pub lock: EntityLock,
    adapters: DomainAdapters,
    hashes: AtomicU64,
}

impl Harness {
    pub fn new() -> Self {
        let ledger = Arc::new(MockLedgerClient::new());
        let records = Arc::new(InMemoryTransactionStore::new());
        let entities = Arc::new(InMemoryEntityStore::new());
        let time = Arc::new(MockTimeSource::new(1_000_000));
        let coordinator = Arc::new(SubmissionCoordinator::new(
            records.clone(),
            ledger.clone(),
            Arc::new(SupplyChainContract::new("0xc0ffee")),
            time.clone(),
            RetryPolicy::default()
                .with_max_retries(3)
                .with_initial_backoff(Duration::from_millis(1))
                .with_max_backoff(Duration::from_millis(4)),
        ));
        let adapters = DomainAdapters::new(
            coordinator.clone(),
            entities.clone(),
            time,
            Duration::from_secs(30),
        );
        Self {
            coordinator,
            ledger,
            records,
            entities,
            lock: adapters.entity_lock(),
            adapters,
            hashes: AtomicU64::new(0),
        }
    }

    pub fn chains(&self) -> Arc<ChainRegistrationAdapter> {
        self.adapters.chains()
    }

    pub fn items(&self) -> Arc<ItemLifecycleAdapter> {
        self.adapters.items()
    }

    pub fn create_request(&self, item_id: u64, quantity: u64) -> CreateItemRequest {
        CreateItemRequest {
            item_id,
            supply_chain_id: 7,
            quantity,
            item_type: "raw-material".to_string(),
            owner: "0xa11ce".to_string(),
        }
    }

    pub async fn confirm(&self, record_id: RecordId) {
        let n = self.hashes.fetch_add(1, Ordering::SeqCst);
        self.coordinator
            .confirm(
                record_id,
                ConfirmationEvidence {
                    transaction_hash: ExternalRef::new(format!("0xfixture{n}")),
                    block_number: Some(n),
                    event: None,
                },
            )
            .await
            .unwrap();
    }

    pub async fn confirmed_chain(&self, chain_id: u64, owner: &str) {
        let intent = self
            .chains()
            .create_chain(chain_id, "Coffee", owner)
            .await
            .unwrap();
        self.confirm(intent.record_id).await;
    }

    pub async fn confirmed_item(&self, item_id: u64, quantity: u64) {
        let intent = self
            .items()
            .create_item(self.create_request(item_id, quantity))
            .await
            .unwrap();
        self.confirm(intent.record_id).await;
    }

    pub async fn authorize(&self, chain_id: u64, participant: &str) {
        let owner = self.entities.load_chain(chain_id).unwrap().unwrap().owner;
        let intent = self
            .chains()
            .authorize_participant(chain_id, participant, "carrier", &owner)
            .await
            .unwrap();
        self.confirm(intent.record_id).await;
    }
}

pub(crate) fn event(kind: EventKind, hash: &str, fields: &[(&str, ParamValue)]) -> LedgerEvent {
    LedgerEvent {
        kind,
        contract: "0xc0ffee".to_string(),
        fields: fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
        transaction_hash: ExternalRef::new(hash),
        block_number: 1,
        log_index: 0,
    }
}
