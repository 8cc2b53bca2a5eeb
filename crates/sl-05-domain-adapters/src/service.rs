//! # Domain Adapters Service
//!
//! Builds both adapters around one entity lock and registers their
//! finalizers with the coordinator.
//!
//! ```text
//!                 ┌──────────── EntityLock ────────────┐
//!                 │                                    │
//! ChainRegistrationAdapter ──is_authorized──┐   ChainRegistrationFinalizer
//!         │                                 │     (CreateChain, AuthorizeParticipant)
//!   AuthorizationCache ◄────────────────────┼──────────┘
//!                                           │
//! ItemLifecycleAdapter ◄────────────────────┘   ItemLifecycleFinalizer
//!                                                 (CreateItem, TransferItem,
//!                                                  ProcessItem, UpdateItemStatus)
//! ```

use crate::authorization_cache::AuthorizationCache;
use crate::chain_registration::ChainRegistrationAdapter;
use crate::finalizers::{ChainRegistrationFinalizer, ItemLifecycleFinalizer};
use crate::item_lifecycle::ItemLifecycleAdapter;
use crate::ports::EntityStore;
use crate::writer::{EntityLock, IntentWriter};
use parking_lot::Mutex;
use shared_types::{LedgerOperation, TimeSource};
use sl_03_submission_coordinator::{LedgerFinalizer, SubmissionCoordinator};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Both domain adapters, wired to a coordinator.
pub struct DomainAdapters {
    chains: Arc<ChainRegistrationAdapter>,
    items: Arc<ItemLifecycleAdapter>,
    lock: EntityLock,
}

impl DomainAdapters {
    /// Build the adapters and register their finalizers with `coordinator`.
    pub fn new(
        coordinator: Arc<SubmissionCoordinator>,
        entities: Arc<dyn EntityStore>,
        time: Arc<dyn TimeSource>,
        auth_cache_ttl: Duration,
    ) -> Self {
        let lock: EntityLock = Arc::new(Mutex::new(()));
        let cache = Arc::new(AuthorizationCache::new(auth_cache_ttl, time));
        let writer = IntentWriter::new(Arc::clone(&coordinator), Arc::clone(&lock));

        let chains = Arc::new(ChainRegistrationAdapter::new(
            writer.clone(),
            Arc::clone(&entities),
            Arc::clone(&cache),
        ));
        let items = Arc::new(ItemLifecycleAdapter::new(
            writer,
            Arc::clone(&entities),
            Arc::clone(&chains),
        ));

        let chain_finalizer: Arc<dyn LedgerFinalizer> = Arc::new(ChainRegistrationFinalizer::new(
            Arc::clone(&entities),
            Arc::clone(&lock),
            cache,
        ));
        let item_finalizer: Arc<dyn LedgerFinalizer> =
            Arc::new(ItemLifecycleFinalizer::new(entities, Arc::clone(&lock)));

        for operation in LedgerOperation::ALL {
            let finalizer = match operation {
                LedgerOperation::CreateChain | LedgerOperation::AuthorizeParticipant => {
                    Arc::clone(&chain_finalizer)
                }
                LedgerOperation::CreateItem
                | LedgerOperation::TransferItem
                | LedgerOperation::ProcessItem
                | LedgerOperation::UpdateItemStatus => Arc::clone(&item_finalizer),
            };
            coordinator.register_finalizer(operation, finalizer);
        }
        info!(
            auth_cache_ttl_secs = auth_cache_ttl.as_secs(),
            "[sl-05] Domain adapters ready"
        );

        Self {
            chains,
            items,
            lock,
        }
    }

    /// Supply chains and participants.
    pub fn chains(&self) -> Arc<ChainRegistrationAdapter> {
        Arc::clone(&self.chains)
    }

    /// Items.
    pub fn items(&self) -> Arc<ItemLifecycleAdapter> {
        Arc::clone(&self.items)
    }

    /// Lock serializing entity writes.
    pub fn entity_lock(&self) -> EntityLock {
        Arc::clone(&self.lock)
    }
}
