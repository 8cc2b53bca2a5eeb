//! # Finalizer Registry
//!
//! Maps each operation to the finalizer that owns its business entity.

use crate::ports::LedgerFinalizer;
use parking_lot::RwLock;
use shared_types::LedgerOperation;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Finalizers keyed by operation.
#[derive(Default)]
pub struct FinalizerRegistry {
    finalizers: RwLock<HashMap<LedgerOperation, Arc<dyn LedgerFinalizer>>>,
}

impl FinalizerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `finalizer` for `operation`, replacing any previous one.
    pub fn register(&self, operation: LedgerOperation, finalizer: Arc<dyn LedgerFinalizer>) {
        debug!(operation = %operation, "[sl-03] Finalizer registered");
        self.finalizers.write().insert(operation, finalizer);
    }

    /// Finalizer for `operation`.
    pub fn get(&self, operation: LedgerOperation) -> Option<Arc<dyn LedgerFinalizer>> {
        self.finalizers.read().get(&operation).cloned()
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.finalizers.read().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.finalizers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RecordingFinalizer;

    #[test]
    fn test_register_and_replace() {
        let registry = FinalizerRegistry::new();
        assert!(registry.get(LedgerOperation::CreateItem).is_none());

        registry.register(LedgerOperation::CreateItem, Arc::new(RecordingFinalizer::default()));
        registry.register(LedgerOperation::CreateItem, Arc::new(RecordingFinalizer::default()));
        registry.register(LedgerOperation::TransferItem, Arc::new(RecordingFinalizer::default()));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(LedgerOperation::CreateItem).is_some());
    }
}
