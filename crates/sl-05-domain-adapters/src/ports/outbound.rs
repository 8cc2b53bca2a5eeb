//! # Outbound Ports
//!
//! Relational persistence of business entities, consumed as keyed
//! load/save per entity kind.

use crate::domain::{Authorization, DomainError, Item, SupplyChain};

/// Entity store - outbound port.
///
/// Plain keyed storage. Callers serialize read-modify-write sequences
/// themselves.
pub trait EntityStore: Send + Sync {
    /// Load a supply chain.
    fn load_chain(&self, id: u64) -> Result<Option<SupplyChain>, DomainError>;

    /// Insert or replace a supply chain.
    fn save_chain(&self, chain: &SupplyChain) -> Result<(), DomainError>;

    /// Load a participant's authorization on a chain.
    fn load_authorization(
        &self,
        chain_id: u64,
        participant: &str,
    ) -> Result<Option<Authorization>, DomainError>;

    /// Insert or replace an authorization.
    fn save_authorization(&self, authorization: &Authorization) -> Result<(), DomainError>;

    /// Every authorization on a chain.
    fn list_authorizations(&self, chain_id: u64) -> Result<Vec<Authorization>, DomainError>;

    /// Load an item.
    fn load_item(&self, id: u64) -> Result<Option<Item>, DomainError>;

    /// Insert or replace an item.
    fn save_item(&self, item: &Item) -> Result<(), DomainError>;
}
