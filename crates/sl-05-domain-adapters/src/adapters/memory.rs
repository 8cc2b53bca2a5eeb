//! In-memory entity store.

use crate::domain::{Authorization, DomainError, Item, SupplyChain};
use crate::ports::EntityStore;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct Tables {
    chains: HashMap<u64, SupplyChain>,
    authorizations: BTreeMap<(u64, String), Authorization>,
    items: HashMap<u64, Item>,
}

/// Entity store backed by hash maps.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    tables: RwLock<Tables>,
}

impl InMemoryEntityStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn item_count(&self) -> usize {
        self.tables.read().items.len()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn load_chain(&self, id: u64) -> Result<Option<SupplyChain>, DomainError> {
        Ok(self.tables.read().chains.get(&id).cloned())
    }

    fn save_chain(&self, chain: &SupplyChain) -> Result<(), DomainError> {
        self.tables.write().chains.insert(chain.id, chain.clone());
        Ok(())
    }

    fn load_authorization(
        &self,
        chain_id: u64,
        participant: &str,
    ) -> Result<Option<Authorization>, DomainError> {
        Ok(self
            .tables
            .read()
            .authorizations
            .get(&(chain_id, participant.to_string()))
            .cloned())
    }

    fn save_authorization(&self, authorization: &Authorization) -> Result<(), DomainError> {
        self.tables.write().authorizations.insert(
            (authorization.chain_id, authorization.participant.clone()),
            authorization.clone(),
        );
        Ok(())
    }

    fn list_authorizations(&self, chain_id: u64) -> Result<Vec<Authorization>, DomainError> {
        Ok(self
            .tables
            .read()
            .authorizations
            .range((chain_id, String::new())..)
            .take_while(|((id, _), _)| *id == chain_id)
            .map(|(_, a)| a.clone())
            .collect())
    }

    fn load_item(&self, id: u64) -> Result<Option<Item>, DomainError> {
        Ok(self.tables.read().items.get(&id).cloned())
    }

    fn save_item(&self, item: &Item) -> Result<(), DomainError> {
        self.tables.write().items.insert(item.id, item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LedgerState;
    use shared_types::RecordId;

    fn authorization(chain_id: u64, participant: &str) -> Authorization {
        Authorization {
            chain_id,
            participant: participant.to_string(),
            role: "carrier".to_string(),
            ledger: LedgerState::pending(RecordId::new()),
        }
    }

    #[test]
    fn test_authorizations_listed_per_chain() {
        let store = InMemoryEntityStore::new();
        store.save_authorization(&authorization(1, "0xa")).unwrap();
        store.save_authorization(&authorization(2, "0xb")).unwrap();
        store.save_authorization(&authorization(2, "0xc")).unwrap();
        store.save_authorization(&authorization(3, "0xd")).unwrap();

        let listed = store.list_authorizations(2).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|a| a.chain_id == 2));
        assert!(store.load_authorization(1, "0xa").unwrap().is_some());
        assert!(store.load_authorization(1, "0xb").unwrap().is_none());
    }

    #[test]
    fn test_item_round_trip() {
        let store = InMemoryEntityStore::new();
        let item = Item::new(42, 7, 100, "raw-material", "0xa11ce", LedgerState::default());
        store.save_item(&item).unwrap();

        assert_eq!(store.load_item(42).unwrap(), Some(item));
        assert_eq!(store.item_count(), 1);
    }
}
