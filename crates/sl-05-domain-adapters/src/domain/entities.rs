//! # Business Entities
//!
//! Local mirror of what the supply-chain contract holds. Every entity
//! carries a [`LedgerState`]; fields written optimistically remember enough
//! to be compensated when the ledger never applies the mutation.

use super::errors::DomainError;
use super::item_status::ItemStatus;
use super::ledger_state::LedgerState;
use serde::{Deserialize, Serialize};
use shared_types::{ExternalRef, LedgerStatus, RecordId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Key of a business entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKey {
    /// Supply chain by id.
    Chain(u64),
    /// Role of a participant on a chain.
    Authorization {
        /// Supply chain.
        chain_id: u64,
        /// Participant address.
        participant: String,
    },
    /// Item by id.
    Item(u64),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Chain(id) => write!(f, "chain:{id}"),
            EntityKey::Authorization {
                chain_id,
                participant,
            } => write!(f, "authorization:{chain_id}:{participant}"),
            EntityKey::Item(id) => write!(f, "item:{id}"),
        }
    }
}

// =============================================================================
// SUPPLY CHAINS & AUTHORIZATIONS
// =============================================================================

/// A registered supply chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyChain {
    /// Chain id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Owner address; implicitly authorized.
    pub owner: String,
    /// Ledger mirror.
    pub ledger: LedgerState,
}

/// A participant's role on a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// Supply chain.
    pub chain_id: u64,
    /// Participant address.
    pub participant: String,
    /// Granted role.
    pub role: String,
    /// Ledger mirror.
    pub ledger: LedgerState,
}

impl Authorization {
    /// Only PENDING or CONFIRMED grants count.
    pub fn is_effective(&self) -> bool {
        matches!(
            self.ledger.ledger_status,
            Some(LedgerStatus::Pending) | Some(LedgerStatus::Confirmed)
        )
    }
}

// =============================================================================
// ITEMS
// =============================================================================

/// A transfer written optimistically and not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    /// Owning record.
    pub record_id: RecordId,
    /// Sender (already debited).
    pub from: String,
    /// Receiver (credited on confirmation).
    pub to: String,
    /// Quantity moved.
    pub quantity: u64,
    /// Item status before the transfer.
    pub prior_status: ItemStatus,
}

/// An unresolved mutation holding the item's ledger mirror, with the state
/// it displaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerClaim {
    /// Owning record.
    pub record_id: RecordId,
    /// Mirror before the mutation was written.
    pub prior: LedgerState,
}

/// A status change written optimistically and not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStatusChange {
    /// Owning record.
    pub record_id: RecordId,
    /// Status to restore on failure.
    pub prior: ItemStatus,
    /// Status written optimistically.
    pub requested: ItemStatus,
}

/// Overall state of a multi-step allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationState {
    /// Some steps unresolved, none failed.
    Pending,
    /// Every step confirmed.
    Complete,
    /// At least one step failed while others confirmed or are pending.
    PartiallyFailed,
    /// Every step failed.
    Failed,
}

/// One parent material consumed into the child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationStep {
    /// Parent item.
    pub parent_item_id: u64,
    /// Quantity consumed.
    pub quantity: u64,
    /// Holder debited.
    pub holder: String,
    /// `ProcessItem` record of this step.
    pub record_id: RecordId,
    /// Resolution of this step.
    pub status: LedgerStatus,
}

/// Materials consumed to produce a processed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// One step per parent material.
    pub steps: Vec<AllocationStep>,
    /// Derived overall state.
    pub state: AllocationState,
}

impl Allocation {
    /// Allocation with every step pending.
    pub fn new(steps: Vec<AllocationStep>) -> Self {
        Self {
            steps,
            state: AllocationState::Pending,
        }
    }

    /// Resolve the step owned by `record_id`; returns the step if it was
    /// still pending.
    pub fn resolve_step(&mut self, record_id: RecordId, status: LedgerStatus) -> Option<AllocationStep> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.record_id == record_id && s.status == LedgerStatus::Pending)?;
        step.status = status;
        let resolved = step.clone();
        self.state = self.derive_state();
        Some(resolved)
    }

    /// Pending step consuming `quantity` of `parent_item_id`.
    pub fn pending_step_for(&self, parent_item_id: u64, quantity: u64) -> Option<RecordId> {
        self.steps
            .iter()
            .find(|s| {
                s.parent_item_id == parent_item_id
                    && s.quantity == quantity
                    && s.status == LedgerStatus::Pending
            })
            .map(|s| s.record_id)
    }

    fn derive_state(&self) -> AllocationState {
        let failed = self
            .steps
            .iter()
            .filter(|s| s.status == LedgerStatus::Failed)
            .count();
        let confirmed = self
            .steps
            .iter()
            .filter(|s| s.status == LedgerStatus::Confirmed)
            .count();

        if failed == self.steps.len() {
            AllocationState::Failed
        } else if failed > 0 {
            AllocationState::PartiallyFailed
        } else if confirmed == self.steps.len() {
            AllocationState::Complete
        } else {
            AllocationState::Pending
        }
    }
}

/// A batch of material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Item id.
    pub id: u64,
    /// Owning supply chain.
    pub supply_chain_id: u64,
    /// Free-form type label.
    pub item_type: String,
    /// Creator.
    pub owner: String,
    /// Quantity created.
    pub quantity: u64,
    /// Quantity per holder.
    pub balances: BTreeMap<String, u64>,
    /// Lifecycle status.
    pub status: ItemStatus,
    /// Unresolved transfers.
    pub pending_transfers: Vec<PendingTransfer>,
    /// Unresolved status change.
    pub pending_status: Option<PendingStatusChange>,
    /// Materials consumed, for processed items.
    pub allocation: Option<Allocation>,
    /// Ledger transactions already applied to this item.
    pub applied_refs: BTreeSet<ExternalRef>,
    /// Ledger mirror of the latest mutation: the creation, or the transfer
    /// or status change written after it.
    pub ledger: LedgerState,
    /// Mutations still holding the mirror, oldest first.
    #[serde(default)]
    pub ledger_claims: Vec<LedgerClaim>,
}

impl Item {
    /// A newly created item held entirely by `owner`.
    pub fn new(
        id: u64,
        supply_chain_id: u64,
        quantity: u64,
        item_type: impl Into<String>,
        owner: impl Into<String>,
        ledger: LedgerState,
    ) -> Self {
        let owner = owner.into();
        let mut balances = BTreeMap::new();
        balances.insert(owner.clone(), quantity);
        Self {
            id,
            supply_chain_id,
            item_type: item_type.into(),
            owner,
            quantity,
            balances,
            status: ItemStatus::Created,
            pending_transfers: Vec::new(),
            pending_status: None,
            allocation: None,
            applied_refs: BTreeSet::new(),
            ledger,
            ledger_claims: Vec::new(),
        }
    }

    /// Quantity held by `holder`.
    pub fn balance(&self, holder: &str) -> u64 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Remove `quantity` from `holder`.
    pub fn debit(&mut self, holder: &str, quantity: u64) -> Result<(), DomainError> {
        let available = self.balance(holder);
        if available < quantity {
            return Err(DomainError::InsufficientQuantity {
                item_id: self.id,
                holder: holder.to_string(),
                available,
                requested: quantity,
            });
        }
        if available == quantity {
            self.balances.remove(holder);
        } else {
            self.balances.insert(holder.to_string(), available - quantity);
        }
        Ok(())
    }

    /// Remove up to `quantity` from `holder`; returns what was removed.
    ///
    /// Used for ledger-reported movements, which are authoritative even when
    /// the local mirror disagrees.
    pub fn debit_up_to(&mut self, holder: &str, quantity: u64) -> u64 {
        let taken = self.balance(holder).min(quantity);
        if taken > 0 {
            // Cannot fail: `taken` never exceeds the balance.
            let _ = self.debit(holder, taken);
        }
        taken
    }

    /// Add `quantity` to `holder`.
    pub fn credit(&mut self, holder: &str, quantity: u64) {
        *self.balances.entry(holder.to_string()).or_insert(0) += quantity;
    }

    /// Remember a ledger transaction; false if it was already applied.
    pub fn mark_applied(&mut self, reference: &ExternalRef) -> bool {
        self.applied_refs.insert(reference.clone())
    }

    /// True if `reference` was already applied.
    pub fn has_applied(&self, reference: &ExternalRef) -> bool {
        self.applied_refs.contains(reference)
    }

    // -------------------------------------------------------------------------
    // Ledger mirror
    // -------------------------------------------------------------------------

    /// Ledger state of the creation, beneath any unresolved mutation.
    pub fn creation_ledger(&self) -> &LedgerState {
        let mut state = &self.ledger;
        while let Some(claim) = state.record_id.and_then(|id| self.claim(id)) {
            state = &claim.prior;
        }
        state
    }

    /// The ledger executed the creation.
    pub fn confirm_creation(&mut self, reference: &ExternalRef) {
        let mut creation = self.creation_ledger().clone();
        creation.confirm(Some(reference.clone()));
        match creation.record_id {
            Some(owner) => self.replace_owned(owner, creation),
            None if self.ledger_claims.is_empty() => self.ledger = creation,
            None => {}
        }
    }

    /// The creation owned by `record_id` never reached the ledger; false if
    /// it is not that record's or no longer pending.
    pub fn fail_creation(&mut self, record_id: RecordId) -> bool {
        let creation = self.creation_ledger();
        if !creation.is_owned_by(record_id) || !creation.is_pending() {
            return false;
        }
        let mut failed = creation.clone();
        failed.fail();
        self.replace_owned(record_id, failed);
        true
    }

    /// True while `record_id` holds the mirror.
    pub fn holds_claim(&self, record_id: RecordId) -> bool {
        self.claim(record_id).is_some()
    }

    /// `record_id` executed on the ledger as `reference`.
    pub fn confirm_claim(&mut self, record_id: RecordId, reference: &ExternalRef) -> bool {
        if self.take_claim(record_id).is_none() {
            return false;
        }
        let confirmed = LedgerState {
            ledger_status: Some(LedgerStatus::Confirmed),
            external_reference: Some(reference.clone()),
            record_id: Some(record_id),
        };
        self.replace_owned(record_id, confirmed);
        true
    }

    /// `record_id` never reached the ledger: hand back the state it displaced.
    pub fn revert_claim(&mut self, record_id: RecordId) -> bool {
        match self.take_claim(record_id) {
            Some(claim) => {
                self.replace_owned(record_id, claim.prior);
                true
            }
            None => false,
        }
    }

    fn claim_ledger(&mut self, record_id: RecordId) {
        let prior = std::mem::replace(&mut self.ledger, LedgerState::pending(record_id));
        self.ledger_claims.push(LedgerClaim { record_id, prior });
    }

    fn claim(&self, record_id: RecordId) -> Option<&LedgerClaim> {
        self.ledger_claims.iter().find(|c| c.record_id == record_id)
    }

    fn take_claim(&mut self, record_id: RecordId) -> Option<LedgerClaim> {
        let index = self
            .ledger_claims
            .iter()
            .position(|c| c.record_id == record_id)?;
        Some(self.ledger_claims.remove(index))
    }

    /// Every copy of the state `record_id` owns, on the item or displaced
    /// by a later claim, becomes `state`.
    fn replace_owned(&mut self, record_id: RecordId, state: LedgerState) {
        if self.ledger.is_owned_by(record_id) {
            self.ledger = state.clone();
        }
        for claim in &mut self.ledger_claims {
            if claim.prior.is_owned_by(record_id) {
                claim.prior = state.clone();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Transfers
    // -------------------------------------------------------------------------

    /// Optimistic transfer: debit the sender, mark in transit, hand the
    /// mirror to `record_id`.
    pub fn begin_transfer(
        &mut self,
        record_id: RecordId,
        from: &str,
        to: &str,
        quantity: u64,
    ) -> Result<(), DomainError> {
        self.debit(from, quantity)?;
        self.pending_transfers.push(PendingTransfer {
            record_id,
            from: from.to_string(),
            to: to.to_string(),
            quantity,
            prior_status: self.status,
        });
        self.status = ItemStatus::InTransit;
        self.claim_ledger(record_id);
        Ok(())
    }

    /// Unresolved transfer with these terms.
    pub fn pending_transfer(&self, from: &str, to: &str, quantity: u64) -> Option<&PendingTransfer> {
        self.pending_transfers
            .iter()
            .find(|t| t.from == from && t.to == to && t.quantity == quantity)
    }

    /// Confirmed: credit the receiver.
    ///
    /// The item stays `InTransit`; delivery is its own `UpdateItemStatus`.
    pub fn settle_transfer(
        &mut self,
        record_id: RecordId,
        reference: &ExternalRef,
    ) -> Option<PendingTransfer> {
        let index = self
            .pending_transfers
            .iter()
            .position(|t| t.record_id == record_id)?;
        let transfer = self.pending_transfers.remove(index);
        self.credit(&transfer.to, transfer.quantity);
        self.confirm_claim(record_id, reference);
        Some(transfer)
    }

    /// Failed: refund the sender and restore the prior status once no other
    /// transfer is in flight.
    pub fn revert_transfer(&mut self, record_id: RecordId) -> Option<PendingTransfer> {
        let index = self
            .pending_transfers
            .iter()
            .position(|t| t.record_id == record_id)?;
        let transfer = self.pending_transfers.remove(index);
        self.credit(&transfer.from, transfer.quantity);
        if self.pending_transfers.is_empty() && self.status == ItemStatus::InTransit {
            self.status = transfer.prior_status;
        }
        self.revert_claim(record_id);
        Some(transfer)
    }

    // -------------------------------------------------------------------------
    // Status changes
    // -------------------------------------------------------------------------

    /// Optimistic status change. A request still in flight is superseded but
    /// keeps its claim until it resolves.
    pub fn begin_status_change(&mut self, record_id: RecordId, requested: ItemStatus) {
        self.pending_status = Some(PendingStatusChange {
            record_id,
            prior: self.status,
            requested,
        });
        self.status = requested;
        self.claim_ledger(record_id);
    }

    /// Confirmed: take the status the ledger reports.
    pub fn settle_status(
        &mut self,
        record_id: Option<RecordId>,
        status: ItemStatus,
        reference: &ExternalRef,
    ) {
        let settles = match (&self.pending_status, record_id) {
            (Some(pending), Some(id)) => pending.record_id == id,
            (Some(pending), None) => pending.requested == status,
            (None, _) => false,
        };
        let owner = if settles {
            self.pending_status.take().map(|p| p.record_id)
        } else {
            record_id
        };
        if let Some(owner) = owner {
            self.confirm_claim(owner, reference);
        }
        self.status = status;
    }

    /// Failed: restore the prior status.
    pub fn revert_status(&mut self, record_id: RecordId) -> Option<PendingStatusChange> {
        self.revert_claim(record_id);
        match &self.pending_status {
            Some(pending) if pending.record_id == record_id => {
                let pending = pending.clone();
                self.status = pending.prior;
                self.pending_status = None;
                Some(pending)
            }
            _ => None,
        }
    }
}
