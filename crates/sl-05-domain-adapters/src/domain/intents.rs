//! Requests accepted by the adapters and the intents they hand back.

use super::entities::EntityKey;
use serde::{Deserialize, Serialize};
use shared_types::RecordId;
use sl_03_submission_coordinator::OutcomeFuture;

/// Register a new item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItemRequest {
    /// Item id.
    pub item_id: u64,
    /// Owning supply chain.
    pub supply_chain_id: u64,
    /// Quantity created.
    pub quantity: u64,
    /// Type label.
    pub item_type: String,
    /// Creator and initial holder.
    pub owner: String,
}

/// One parent material consumed by processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialInput {
    /// Parent item.
    pub parent_item_id: u64,
    /// Quantity consumed.
    pub quantity: u64,
}

/// Produce a child item from parent materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessItemRequest {
    /// Child item to create.
    pub child_item_id: u64,
    /// Owning supply chain.
    pub supply_chain_id: u64,
    /// Quantity produced.
    pub quantity: u64,
    /// Type label of the child.
    pub item_type: String,
    /// Processor; holds the materials and receives the child.
    pub owner: String,
    /// Materials consumed.
    pub inputs: Vec<MaterialInput>,
}

/// A business intent accepted locally and handed to the coordinator.
///
/// Returned immediately; the entity stays PENDING until the ledger decides.
#[derive(Debug)]
pub struct PendingIntent {
    /// Entity written optimistically.
    pub entity: EntityKey,
    /// Record created for the submission.
    pub record_id: RecordId,
    /// In-flight record this one follows, when redundant.
    pub redundant_of: Option<RecordId>,
    /// Resolves on CONFIRMED or FAILED; may be dropped.
    pub outcome: OutcomeFuture,
}

/// Intents of a processing request: the child's creation, then one step
/// per parent material.
#[derive(Debug)]
pub struct AllocationIntent {
    /// `CreateItem` of the child.
    pub child: PendingIntent,
    /// `ProcessItem` per parent, in request order.
    pub steps: Vec<PendingIntent>,
}
