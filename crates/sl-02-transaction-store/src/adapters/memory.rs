//! In-memory transaction store.

use crate::domain::{StoreError, TransactionRecord};
use crate::ports::TransactionStore;
use parking_lot::RwLock;
use shared_types::RecordId;
use std::collections::HashMap;

/// `TransactionStore` backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    records: RwLock<HashMap<RecordId, TransactionRecord>>,
}

impl InMemoryTransactionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn create(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    fn get(&self, id: RecordId) -> Result<Option<TransactionRecord>, StoreError> {
        Ok(self.records.read().get(&id).cloned())
    }

    fn update(&self, record: &TransactionRecord) -> Result<TransactionRecord, StoreError> {
        let mut records = self.records.write();
        let stored = records
            .get_mut(&record.id)
            .ok_or(StoreError::NotFound(record.id))?;

        if stored.version != record.version {
            return Err(StoreError::ConcurrentConflict {
                id: record.id,
                expected: record.version,
                actual: stored.version,
            });
        }

        let mut next = record.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    fn scan(
        &self,
        predicate: &dyn Fn(&TransactionRecord) -> bool,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut found: Vec<TransactionRecord> = self
            .records
            .read()
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}
