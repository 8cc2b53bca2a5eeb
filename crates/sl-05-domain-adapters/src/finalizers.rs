//! # Finalizers
//!
//! The only code that moves an entity's ledger state to CONFIRMED or
//! FAILED. The coordinator calls these after storing the record
//! transition; the reconciler routes unmatched events here.
//!
//! | Hook | Source of truth |
//! |------|-----------------|
//! | `on_confirmed` | the confirming event when present, else the record's parameters |
//! | `on_unmatched` | the event |
//! | `on_failed` | the record's parameters; compensates the optimistic write |
//!
//! Every confirmation is keyed by transaction hash so a replayed event never
//! applies twice.

use crate::authorization_cache::AuthorizationCache;
use crate::domain::{
    Authorization, DomainError, Item, LedgerCall, LedgerState, SupplyChain,
};
use crate::ports::EntityStore;
use crate::writer::EntityLock;
use async_trait::async_trait;
use shared_types::{ExternalRef, LedgerEvent, LedgerStatus, RecordId};
use sl_02_transaction_store::TransactionRecord;
use sl_03_submission_coordinator::{FinalizerError, LedgerFinalizer};
use std::sync::Arc;
use tracing::{debug, info, warn};

fn confirmed_call(
    record: &TransactionRecord,
    event: Option<&LedgerEvent>,
) -> Result<(LedgerCall, ExternalRef), DomainError> {
    let call = match event {
        Some(event) => LedgerCall::from_event(event)?,
        None => LedgerCall::from_parameters(record.operation, &record.parameters)?,
    };
    let reference = event
        .map(|e| e.transaction_hash.clone())
        .or_else(|| record.external_reference.clone())
        .ok_or_else(|| DomainError::validation(format!("confirmed record {} has no transaction hash", record.id)))?;
    Ok((call, reference))
}

fn unexpected(call: &LedgerCall) -> DomainError {
    DomainError::validation(format!("{} is not handled by this finalizer", call.operation()))
}

// =============================================================================
// CHAIN REGISTRATION
// =============================================================================

/// Finalizer for `CreateChain` and `AuthorizeParticipant`.
pub struct ChainRegistrationFinalizer {
    entities: Arc<dyn EntityStore>,
    lock: EntityLock,
    cache: Arc<AuthorizationCache>,
}

impl ChainRegistrationFinalizer {
    /// Finalizer sharing `lock` with the adapters.
    pub fn new(
        entities: Arc<dyn EntityStore>,
        lock: EntityLock,
        cache: Arc<AuthorizationCache>,
    ) -> Self {
        Self {
            entities,
            lock,
            cache,
        }
    }

    fn apply_confirmed(&self, call: LedgerCall, reference: ExternalRef) -> Result<(), DomainError> {
        let _guard = self.lock.lock();
        match call {
            LedgerCall::CreateChain {
                chain_id,
                name,
                owner,
            } => {
                let chain = match self.entities.load_chain(chain_id)? {
                    Some(mut chain) => {
                        if chain.ledger.is_failed() {
                            warn!(chain_id, tx_hash = %reference, "[sl-05] Ledger created a chain marked FAILED locally");
                        }
                        chain.name = name;
                        chain.owner = owner;
                        chain.ledger.confirm(Some(reference.clone()));
                        chain
                    }
                    None => SupplyChain {
                        id: chain_id,
                        name,
                        owner,
                        ledger: LedgerState::confirmed(reference.clone()),
                    },
                };
                self.entities.save_chain(&chain)?;
                self.cache.invalidate_chain(chain_id);
                info!(chain_id, tx_hash = %reference, "[sl-05] Supply chain confirmed");
            }
            LedgerCall::Authorize {
                chain_id,
                participant,
                role,
            } => {
                let authorization = match self.entities.load_authorization(chain_id, &participant)? {
                    Some(mut authorization) => {
                        authorization.role = role;
                        authorization.ledger.confirm(Some(reference.clone()));
                        authorization
                    }
                    None => Authorization {
                        chain_id,
                        participant: participant.clone(),
                        role,
                        ledger: LedgerState::confirmed(reference.clone()),
                    },
                };
                self.entities.save_authorization(&authorization)?;
                self.cache.invalidate(chain_id, &participant);
                info!(
                    chain_id,
                    participant = %participant,
                    tx_hash = %reference,
                    "[sl-05] Authorization confirmed"
                );
            }
            other => return Err(unexpected(&other)),
        }
        Ok(())
    }

    fn apply_failed(&self, record: &TransactionRecord) -> Result<(), DomainError> {
        let call = LedgerCall::from_parameters(record.operation, &record.parameters)?;
        let _guard = self.lock.lock();
        match call {
            LedgerCall::CreateChain { chain_id, .. } => {
                if let Some(mut chain) = self.entities.load_chain(chain_id)? {
                    if chain.ledger.is_owned_by(record.id) && chain.ledger.is_pending() {
                        chain.ledger.fail();
                        self.entities.save_chain(&chain)?;
                        self.cache.invalidate_chain(chain_id);
                        warn!(chain_id, record_id = %record.id, "[sl-05] Supply chain marked FAILED");
                    }
                }
            }
            LedgerCall::Authorize {
                chain_id,
                participant,
                ..
            } => {
                if let Some(mut authorization) = self.entities.load_authorization(chain_id, &participant)? {
                    if authorization.ledger.is_owned_by(record.id) && authorization.ledger.is_pending() {
                        authorization.ledger.fail();
                        self.entities.save_authorization(&authorization)?;
                        self.cache.invalidate(chain_id, &participant);
                        warn!(
                            chain_id,
                            participant = %participant,
                            record_id = %record.id,
                            "[sl-05] Authorization marked FAILED"
                        );
                    }
                }
            }
            other => return Err(unexpected(&other)),
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerFinalizer for ChainRegistrationFinalizer {
    async fn on_confirmed(
        &self,
        record: &TransactionRecord,
        event: Option<&LedgerEvent>,
    ) -> Result<(), FinalizerError> {
        let (call, reference) = confirmed_call(record, event).map_err(FinalizerError::new)?;
        self.apply_confirmed(call, reference)
            .map_err(FinalizerError::new)
    }

    async fn on_unmatched(&self, event: &LedgerEvent) -> Result<(), FinalizerError> {
        let call = LedgerCall::from_event(event).map_err(FinalizerError::new)?;
        self.apply_confirmed(call, event.transaction_hash.clone())
            .map_err(FinalizerError::new)
    }

    async fn on_failed(&self, record: &TransactionRecord) -> Result<(), FinalizerError> {
        self.apply_failed(record).map_err(FinalizerError::new)
    }
}

// =============================================================================
// ITEM LIFECYCLE
// =============================================================================

/// Finalizer for the four item operations.
pub struct ItemLifecycleFinalizer {
    entities: Arc<dyn EntityStore>,
    lock: EntityLock,
}

impl ItemLifecycleFinalizer {
    /// Finalizer sharing `lock` with the adapters.
    pub fn new(entities: Arc<dyn EntityStore>, lock: EntityLock) -> Self {
        Self { entities, lock }
    }

    fn item(&self, item_id: u64) -> Result<Item, DomainError> {
        self.entities
            .load_item(item_id)?
            .ok_or_else(|| DomainError::not_found("item", item_id))
    }

    /// Apply a ledger-confirmed call. `record_id` is `None` for events no
    /// local record matched.
    fn apply_confirmed(
        &self,
        call: LedgerCall,
        record_id: Option<RecordId>,
        reference: ExternalRef,
    ) -> Result<(), DomainError> {
        let _guard = self.lock.lock();
        match call {
            LedgerCall::CreateItem {
                item_id,
                supply_chain_id,
                quantity,
                item_type,
                owner,
            } => {
                let item = match self.entities.load_item(item_id)? {
                    Some(mut item) => {
                        if !item.mark_applied(&reference) {
                            debug!(item_id, tx_hash = %reference, "[sl-05] Item creation already applied");
                            return Ok(());
                        }
                        if item.creation_ledger().is_failed() {
                            warn!(item_id, tx_hash = %reference, "[sl-05] Ledger created an item marked FAILED locally");
                        }
                        item.confirm_creation(&reference);
                        item
                    }
                    None => {
                        let mut item = Item::new(
                            item_id,
                            supply_chain_id,
                            quantity,
                            item_type,
                            owner,
                            LedgerState::confirmed(reference.clone()),
                        );
                        item.mark_applied(&reference);
                        item
                    }
                };
                self.entities.save_item(&item)?;
                info!(item_id, tx_hash = %reference, "[sl-05] Item creation confirmed");
            }

            LedgerCall::Transfer {
                item_id,
                from,
                to,
                quantity,
            } => {
                let mut item = self.item(item_id)?;
                if !item.mark_applied(&reference) {
                    debug!(item_id, tx_hash = %reference, "[sl-05] Transfer already applied");
                    return Ok(());
                }
                let settled = match record_id {
                    Some(id) => item.settle_transfer(id, &reference).is_some(),
                    None => false,
                };
                if !settled {
                    let pending = item.pending_transfer(&from, &to, quantity).map(|t| t.record_id);
                    match pending {
                        Some(id) => {
                            item.settle_transfer(id, &reference);
                        }
                        None => {
                            let taken = item.debit_up_to(&from, quantity);
                            if taken < quantity {
                                warn!(
                                    item_id,
                                    holder = %from,
                                    mirrored = taken,
                                    quantity,
                                    "[sl-05] Ledger transfer exceeds local balance"
                                );
                            }
                            item.credit(&to, quantity);
                        }
                    }
                }
                self.entities.save_item(&item)?;
                info!(item_id, from = %from, to = %to, quantity, tx_hash = %reference, "[sl-05] Transfer confirmed");
            }

            LedgerCall::Process {
                parent_item_id,
                child_item_id,
                quantity,
            } => {
                let mut child = self.entities.load_item(child_item_id)?;
                if let Some(child) = child.as_mut() {
                    if !child.mark_applied(&reference) {
                        debug!(child_item_id, tx_hash = %reference, "[sl-05] Processing step already applied");
                        return Ok(());
                    }
                }

                let resolved = child
                    .as_mut()
                    .and_then(|c| c.allocation.as_mut())
                    .and_then(|allocation| {
                        let step = record_id
                            .or_else(|| allocation.pending_step_for(parent_item_id, quantity))?;
                        allocation.resolve_step(step, LedgerStatus::Confirmed)
                    })
                    .is_some();

                if !resolved {
                    // Material the mirror never debited.
                    let mut parent = self.item(parent_item_id)?;
                    if parent.mark_applied(&reference) {
                        let holder = child
                            .as_ref()
                            .map_or_else(|| parent.owner.clone(), |c| c.owner.clone());
                        let taken = parent.debit_up_to(&holder, quantity);
                        if taken < quantity {
                            warn!(
                                parent_item_id,
                                holder = %holder,
                                mirrored = taken,
                                quantity,
                                "[sl-05] Ledger consumed more material than held locally"
                            );
                        }
                        self.entities.save_item(&parent)?;
                    }
                }
                if let Some(child) = &child {
                    self.entities.save_item(child)?;
                }
                info!(
                    parent_item_id,
                    child_item_id,
                    quantity,
                    tx_hash = %reference,
                    "[sl-05] Processing step confirmed"
                );
            }

            LedgerCall::UpdateStatus { item_id, status } => {
                let mut item = self.item(item_id)?;
                if !item.mark_applied(&reference) {
                    debug!(item_id, tx_hash = %reference, "[sl-05] Status change already applied");
                    return Ok(());
                }
                match item.pending_status.as_mut() {
                    // A newer request is still in flight; it now reverts to this status.
                    Some(pending)
                        if record_id.is_some_and(|id| id != pending.record_id)
                            || (record_id.is_none() && pending.requested != status) =>
                    {
                        pending.prior = status;
                        if let Some(id) = record_id {
                            item.confirm_claim(id, &reference);
                        }
                    }
                    _ => item.settle_status(record_id, status, &reference),
                }
                self.entities.save_item(&item)?;
                info!(item_id, status = %status, tx_hash = %reference, "[sl-05] Status change confirmed");
            }

            other => return Err(unexpected(&other)),
        }
        Ok(())
    }

    fn apply_failed(&self, record: &TransactionRecord) -> Result<(), DomainError> {
        let call = LedgerCall::from_parameters(record.operation, &record.parameters)?;
        let _guard = self.lock.lock();
        match call {
            LedgerCall::CreateItem { item_id, .. } => {
                if let Some(mut item) = self.entities.load_item(item_id)? {
                    if item.fail_creation(record.id) {
                        self.entities.save_item(&item)?;
                        warn!(item_id, record_id = %record.id, "[sl-05] Item marked FAILED");
                    }
                }
            }

            LedgerCall::Transfer { item_id, .. } => {
                if let Some(mut item) = self.entities.load_item(item_id)? {
                    if let Some(transfer) = item.revert_transfer(record.id) {
                        self.entities.save_item(&item)?;
                        warn!(
                            item_id,
                            record_id = %record.id,
                            holder = %transfer.from,
                            quantity = transfer.quantity,
                            "[sl-05] Transfer compensated"
                        );
                    }
                }
            }

            LedgerCall::Process {
                parent_item_id,
                child_item_id,
                ..
            } => {
                let Some(mut child) = self.entities.load_item(child_item_id)? else {
                    return Ok(());
                };
                let step = child
                    .allocation
                    .as_mut()
                    .and_then(|allocation| allocation.resolve_step(record.id, LedgerStatus::Failed));
                if let Some(step) = step {
                    let mut parent = self.item(parent_item_id)?;
                    parent.credit(&step.holder, step.quantity);
                    self.entities.save_item(&parent)?;
                    self.entities.save_item(&child)?;
                    warn!(
                        parent_item_id,
                        child_item_id,
                        record_id = %record.id,
                        quantity = step.quantity,
                        "[sl-05] Processing step failed, material restored"
                    );
                }
            }

            LedgerCall::UpdateStatus { item_id, .. } => {
                if let Some(mut item) = self.entities.load_item(item_id)? {
                    let claimed = item.holds_claim(record.id);
                    if let Some(change) = item.revert_status(record.id) {
                        self.entities.save_item(&item)?;
                        warn!(
                            item_id,
                            record_id = %record.id,
                            restored = %change.prior,
                            "[sl-05] Status change compensated"
                        );
                    } else if claimed {
                        // Superseded by a newer request; only the mirror moves back.
                        self.entities.save_item(&item)?;
                        debug!(item_id, record_id = %record.id, "[sl-05] Superseded status change failed");
                    }
                }
            }

            other => return Err(unexpected(&other)),
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerFinalizer for ItemLifecycleFinalizer {
    async fn on_confirmed(
        &self,
        record: &TransactionRecord,
        event: Option<&LedgerEvent>,
    ) -> Result<(), FinalizerError> {
        let (call, reference) = confirmed_call(record, event).map_err(FinalizerError::new)?;
        self.apply_confirmed(call, Some(record.id), reference)
            .map_err(FinalizerError::new)
    }

    async fn on_unmatched(&self, event: &LedgerEvent) -> Result<(), FinalizerError> {
        let call = LedgerCall::from_event(event).map_err(FinalizerError::new)?;
        self.apply_confirmed(call, None, event.transaction_hash.clone())
            .map_err(FinalizerError::new)
    }

    async fn on_failed(&self, record: &TransactionRecord) -> Result<(), FinalizerError> {
        self.apply_failed(record).map_err(FinalizerError::new)
    }
}
