//! # Inbound Ports
//!
//! Business intents, one method each. Every method validates against the
//! local mirror first (no record is created on failure), writes the
//! optimistic mutation, dispatches the submission and returns at once.

use crate::domain::{
    AllocationIntent, CreateItemRequest, DomainError, ItemStatus, PendingIntent,
    ProcessItemRequest,
};
use async_trait::async_trait;

/// Supply chains and participants.
#[async_trait]
pub trait ChainRegistrationApi: Send + Sync {
    /// Register a supply chain owned by `owner`.
    async fn create_chain(
        &self,
        chain_id: u64,
        name: &str,
        owner: &str,
    ) -> Result<PendingIntent, DomainError>;

    /// Grant `participant` a role on a chain. Only the chain owner may grant.
    async fn authorize_participant(
        &self,
        chain_id: u64,
        participant: &str,
        role: &str,
        granted_by: &str,
    ) -> Result<PendingIntent, DomainError>;

    /// Whether `participant` may act on the chain.
    fn is_authorized(&self, chain_id: u64, participant: &str) -> Result<bool, DomainError>;
}

/// Items and their movements.
#[async_trait]
pub trait ItemLifecycleApi: Send + Sync {
    /// Register a new item.
    async fn create_item(&self, request: CreateItemRequest) -> Result<PendingIntent, DomainError>;

    /// Move quantity between holders.
    async fn transfer_item(
        &self,
        item_id: u64,
        from: &str,
        to: &str,
        quantity: u64,
    ) -> Result<PendingIntent, DomainError>;

    /// Consume parent materials into a new child item.
    async fn process_item(&self, request: ProcessItemRequest) -> Result<AllocationIntent, DomainError>;

    /// Change an item's status code.
    async fn update_item_status(
        &self,
        item_id: u64,
        status: ItemStatus,
        caller: &str,
    ) -> Result<PendingIntent, DomainError>;
}
