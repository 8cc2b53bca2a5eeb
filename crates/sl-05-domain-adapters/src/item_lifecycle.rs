//! # Item Lifecycle Adapter
//!
//! Item creation, transfers, processing and status changes.
//!
//! Quantities are checked against the local mirror before anything is
//! recorded. Transfers debit the sender optimistically; the receiver is
//! credited only once the ledger confirms.

use crate::chain_registration::ChainRegistrationAdapter;
use crate::domain::{
    Allocation, AllocationIntent, AllocationStep, CreateItemRequest, DomainError, EntityKey, Item,
    ItemStatus, LedgerCall, LedgerState, PendingIntent, ProcessItemRequest,
};
use crate::ports::{ChainRegistrationApi, EntityStore, ItemLifecycleApi};
use crate::writer::IntentWriter;
use async_trait::async_trait;
use shared_types::{LedgerStatus, RecordId};
use sl_03_submission_coordinator::PreparedSubmission;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Item lifecycle adapter.
pub struct ItemLifecycleAdapter {
    writer: IntentWriter,
    entities: Arc<dyn EntityStore>,
    chains: Arc<ChainRegistrationAdapter>,
}

impl ItemLifecycleAdapter {
    /// Create the adapter. `chains` answers authorization lookups.
    pub fn new(
        writer: IntentWriter,
        entities: Arc<dyn EntityStore>,
        chains: Arc<ChainRegistrationAdapter>,
    ) -> Self {
        Self {
            writer,
            entities,
            chains,
        }
    }

    fn require_authorized(&self, chain_id: u64, participant: &str) -> Result<(), DomainError> {
        if self.chains.is_authorized(chain_id, participant)? {
            Ok(())
        } else {
            Err(DomainError::NotAuthorized {
                chain_id,
                participant: participant.to_string(),
            })
        }
    }

    fn require_chain(&self, chain_id: u64) -> Result<(), DomainError> {
        match self.entities.load_chain(chain_id)? {
            Some(chain) if !chain.ledger.is_failed() => Ok(()),
            _ => Err(DomainError::not_found("supply chain", chain_id)),
        }
    }

    fn live_item(&self, item_id: u64) -> Result<Item, DomainError> {
        self.entities
            .load_item(item_id)?
            .filter(|item| !item.creation_ledger().is_failed())
            .ok_or_else(|| DomainError::not_found("item", item_id))
    }

    fn stage_create(&self, request: CreateItemRequest) -> Result<PendingIntent, DomainError> {
        let owner = request.owner.trim().to_lowercase();
        let item_type = request.item_type.trim().to_string();
        if request.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if item_type.is_empty() {
            return Err(DomainError::validation("item type must not be empty"));
        }
        let item_id = request.item_id;
        let chain_id = request.supply_chain_id;

        let prepared = {
            let _guard = self.writer.lock();
            let existing = self.entities.load_item(item_id)?;
            let repeated = existing.as_ref().is_some_and(|item| {
                item.creation_ledger().is_pending()
                    && item.supply_chain_id == chain_id
                    && item.quantity == request.quantity
                    && item.item_type == item_type
                    && item.owner == owner
            });
            if !repeated {
                if existing.is_some_and(|item| !item.creation_ledger().is_failed()) {
                    return Err(DomainError::AlreadyExists {
                        kind: "item",
                        id: item_id.to_string(),
                    });
                }
                self.require_chain(chain_id)?;
                self.require_authorized(chain_id, &owner)?;
            }

            let call = LedgerCall::CreateItem {
                item_id,
                supply_chain_id: chain_id,
                quantity: request.quantity,
                item_type: item_type.clone(),
                owner: owner.clone(),
            };
            self.writer
                .stage(call.operation(), call.to_parameters(), |record_id| {
                    self.entities.save_item(&Item::new(
                        item_id,
                        chain_id,
                        request.quantity,
                        item_type.as_str(),
                        owner.as_str(),
                        LedgerState::pending(record_id),
                    ))
                })?
        };

        info!(
            item_id,
            chain_id,
            quantity = request.quantity,
            record_id = %prepared.id(),
            "[sl-05] Item creation submitted"
        );
        self.writer.dispatch(EntityKey::Item(item_id), prepared)
    }

    fn stage_transfer(
        &self,
        item_id: u64,
        from: &str,
        to: &str,
        quantity: u64,
    ) -> Result<PendingIntent, DomainError> {
        let from = from.trim().to_lowercase();
        let to = to.trim().to_lowercase();
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if from == to {
            return Err(DomainError::validation("sender and receiver must differ"));
        }

        let prepared = {
            let _guard = self.writer.lock();
            let mut item = self.live_item(item_id)?;
            let repeated = item.pending_transfer(&from, &to, quantity).is_some();
            if !repeated {
                self.require_authorized(item.supply_chain_id, &from)?;
                self.require_authorized(item.supply_chain_id, &to)?;
                let available = item.balance(&from);
                if available < quantity {
                    return Err(DomainError::InsufficientQuantity {
                        item_id,
                        holder: from,
                        available,
                        requested: quantity,
                    });
                }
            }

            let call = LedgerCall::Transfer {
                item_id,
                from: from.clone(),
                to: to.clone(),
                quantity,
            };
            self.writer
                .stage(call.operation(), call.to_parameters(), |record_id| {
                    item.begin_transfer(record_id, &from, &to, quantity)?;
                    self.entities.save_item(&item)
                })?
        };

        info!(
            item_id,
            from = %from,
            to = %to,
            quantity,
            record_id = %prepared.id(),
            "[sl-05] Item transfer submitted"
        );
        self.writer.dispatch(EntityKey::Item(item_id), prepared)
    }

    fn stage_status(
        &self,
        item_id: u64,
        status: ItemStatus,
        caller: &str,
    ) -> Result<PendingIntent, DomainError> {
        let caller = caller.trim().to_lowercase();

        let prepared = {
            let _guard = self.writer.lock();
            let mut item = self.live_item(item_id)?;
            let repeated = item
                .pending_status
                .as_ref()
                .is_some_and(|pending| pending.requested == status);
            if !repeated {
                self.require_authorized(item.supply_chain_id, &caller)?;
                if item.status == status {
                    return Err(DomainError::validation(format!(
                        "item {item_id} already has status {status}"
                    )));
                }
            }

            let call = LedgerCall::UpdateStatus { item_id, status };
            self.writer
                .stage(call.operation(), call.to_parameters(), |record_id| {
                    item.begin_status_change(record_id, status);
                    self.entities.save_item(&item)
                })?
        };

        info!(
            item_id,
            status = %status,
            record_id = %prepared.id(),
            "[sl-05] Item status change submitted"
        );
        self.writer.dispatch(EntityKey::Item(item_id), prepared)
    }

    fn stage_process(&self, request: ProcessItemRequest) -> Result<AllocationIntent, DomainError> {
        let owner = request.owner.trim().to_lowercase();
        let item_type = request.item_type.trim().to_string();
        let child_id = request.child_item_id;
        let chain_id = request.supply_chain_id;
        if request.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if item_type.is_empty() {
            return Err(DomainError::validation("item type must not be empty"));
        }
        if request.inputs.is_empty() {
            return Err(DomainError::validation("processing needs at least one input"));
        }
        if request.inputs.iter().any(|input| input.quantity == 0) {
            return Err(DomainError::validation("input quantities must be positive"));
        }
        if request.inputs.iter().any(|input| input.parent_item_id == child_id) {
            return Err(DomainError::validation("an item cannot consume itself"));
        }

        let (child, steps) = {
            let _guard = self.writer.lock();
            if self
                .entities
                .load_item(child_id)?
                .is_some_and(|item| !item.creation_ledger().is_failed())
            {
                return Err(DomainError::AlreadyExists {
                    kind: "item",
                    id: child_id.to_string(),
                });
            }
            self.require_chain(chain_id)?;
            self.require_authorized(chain_id, &owner)?;

            // Duplicate inputs of the same parent draw on one balance.
            let mut demand: BTreeMap<u64, u64> = BTreeMap::new();
            for input in &request.inputs {
                *demand.entry(input.parent_item_id).or_insert(0) += input.quantity;
            }
            let mut parents = BTreeMap::new();
            for (&parent_id, &needed) in &demand {
                let parent = self.live_item(parent_id)?;
                let available = parent.balance(&owner);
                if available < needed {
                    return Err(DomainError::InsufficientQuantity {
                        item_id: parent_id,
                        holder: owner.clone(),
                        available,
                        requested: needed,
                    });
                }
                parents.insert(parent_id, parent);
            }

            let child_call = LedgerCall::CreateItem {
                item_id: child_id,
                supply_chain_id: chain_id,
                quantity: request.quantity,
                item_type: item_type.clone(),
                owner: owner.clone(),
            };
            let child = self
                .writer
                .prepare(child_call.operation(), child_call.to_parameters())?;

            let mut steps: Vec<PreparedSubmission> = Vec::with_capacity(request.inputs.len());
            for input in &request.inputs {
                let call = LedgerCall::Process {
                    parent_item_id: input.parent_item_id,
                    child_item_id: child_id,
                    quantity: input.quantity,
                };
                match self.writer.prepare(call.operation(), call.to_parameters()) {
                    Ok(prepared) => steps.push(prepared),
                    Err(e) => {
                        self.writer.orphan(&owned_ids(&child, &steps), &e);
                        return Err(e);
                    }
                }
            }

            let written = self.write_allocation(&request, &owner, &item_type, &child, &steps, parents);
            if let Err(e) = written {
                self.writer.orphan(&owned_ids(&child, &steps), &e);
                return Err(e);
            }
            (child, steps)
        };

        info!(
            child_item_id = child_id,
            inputs = steps.len(),
            record_id = %child.id(),
            "[sl-05] Item processing submitted"
        );

        let child = self.writer.dispatch(EntityKey::Item(child_id), child)?;
        let steps = request
            .inputs
            .iter()
            .zip(steps)
            .map(|(input, prepared)| {
                self.writer
                    .dispatch(EntityKey::Item(input.parent_item_id), prepared)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AllocationIntent { child, steps })
    }

    /// Child entity with its allocation, and the parents debited.
    fn write_allocation(
        &self,
        request: &ProcessItemRequest,
        owner: &str,
        item_type: &str,
        child: &PreparedSubmission,
        steps: &[PreparedSubmission],
        mut parents: BTreeMap<u64, Item>,
    ) -> Result<(), DomainError> {
        let mut allocation = Vec::with_capacity(steps.len());
        for (input, prepared) in request.inputs.iter().zip(steps) {
            if prepared.is_redundant() {
                continue;
            }
            let parent = parents
                .get_mut(&input.parent_item_id)
                .ok_or_else(|| DomainError::not_found("item", input.parent_item_id))?;
            parent.debit(owner, input.quantity)?;
            allocation.push(AllocationStep {
                parent_item_id: input.parent_item_id,
                quantity: input.quantity,
                holder: owner.to_string(),
                record_id: prepared.id(),
                status: LedgerStatus::Pending,
            });
        }

        let mut item = Item::new(
            request.child_item_id,
            request.supply_chain_id,
            request.quantity,
            item_type,
            owner,
            LedgerState::pending(child.id()),
        );
        item.allocation = Some(Allocation::new(allocation));

        self.entities.save_item(&item)?;
        for parent in parents.values() {
            self.entities.save_item(parent)?;
        }
        Ok(())
    }
}

fn owned_ids(child: &PreparedSubmission, steps: &[PreparedSubmission]) -> Vec<RecordId> {
    std::iter::once(child)
        .chain(steps)
        .filter(|p| !p.is_redundant())
        .map(PreparedSubmission::id)
        .collect()
}

#[async_trait]
impl ItemLifecycleApi for ItemLifecycleAdapter {
    async fn create_item(&self, request: CreateItemRequest) -> Result<PendingIntent, DomainError> {
        self.stage_create(request)
    }

    async fn transfer_item(
        &self,
        item_id: u64,
        from: &str,
        to: &str,
        quantity: u64,
    ) -> Result<PendingIntent, DomainError> {
        self.stage_transfer(item_id, from, to, quantity)
    }

    async fn process_item(&self, request: ProcessItemRequest) -> Result<AllocationIntent, DomainError> {
        self.stage_process(request)
    }

    async fn update_item_status(
        &self,
        item_id: u64,
        status: ItemStatus,
        caller: &str,
    ) -> Result<PendingIntent, DomainError> {
        self.stage_status(item_id, status, caller)
    }
}
