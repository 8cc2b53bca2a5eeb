//! # Event Filters
//!
//! Selects which ledger events a subscription receives: the emitting
//! contract, the event kinds, and the first block of interest.

use serde::{Deserialize, Serialize};
use shared_types::{EventKind, LedgerEvent};

/// Subscription filter.
///
/// Empty `kinds` accepts every kind; `contract = None` accepts every
/// contract; `from_block = None` means "from the latest block on".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Emitting contract address (lowercase).
    pub contract: Option<String>,
    /// Accepted event kinds.
    pub kinds: Vec<EventKind>,
    /// First block to deliver, inclusive.
    pub from_block: Option<u64>,
}

impl EventFilter {
    /// Accept every event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept every event emitted by `contract`.
    #[must_use]
    pub fn contract(contract: impl AsRef<str>) -> Self {
        Self {
            contract: Some(contract.as_ref().to_lowercase()),
            ..Self::default()
        }
    }

    /// Restrict to the given kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: Vec<EventKind>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Start delivery at `block` (inclusive).
    #[must_use]
    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        let contract_match = self
            .contract
            .as_deref()
            .map_or(true, |c| c.eq_ignore_ascii_case(&event.contract));

        let kind_match = self.kinds.is_empty() || self.kinds.contains(&event.kind);

        let block_match = self.from_block.map_or(true, |b| event.block_number >= b);

        contract_match && kind_match && block_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ExternalRef;
    use std::collections::BTreeMap;

    fn event(kind: EventKind, contract: &str, block: u64) -> LedgerEvent {
        LedgerEvent {
            kind,
            contract: contract.to_string(),
            fields: BTreeMap::new(),
            transaction_hash: ExternalRef::new("0x01"),
            block_number: block,
            log_index: 0,
        }
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&event(EventKind::ItemCreated, "0xaa", 1)));
    }

    #[test]
    fn test_filter_by_contract_ignores_case() {
        let filter = EventFilter::contract("0xAA");
        assert!(filter.matches(&event(EventKind::ItemCreated, "0xaa", 1)));
        assert!(!filter.matches(&event(EventKind::ItemCreated, "0xbb", 1)));
    }

    #[test]
    fn test_filter_by_kind() {
        let filter = EventFilter::all().with_kinds(vec![EventKind::ItemTransferred]);
        assert!(filter.matches(&event(EventKind::ItemTransferred, "0xaa", 1)));
        assert!(!filter.matches(&event(EventKind::ItemCreated, "0xaa", 1)));
    }

    #[test]
    fn test_filter_from_block_inclusive() {
        let filter = EventFilter::all().from_block(10);
        assert!(!filter.matches(&event(EventKind::ItemCreated, "0xaa", 9)));
        assert!(filter.matches(&event(EventKind::ItemCreated, "0xaa", 10)));
    }
}
