//! In-memory checkpoint store.

use crate::domain::ReconcileError;
use crate::ports::CheckpointStore;
use parking_lot::RwLock;
use shared_types::EventPosition;

/// Checkpoint held in memory; lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    position: RwLock<Option<EventPosition>>,
}

impl InMemoryCheckpointStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `position`.
    pub fn at(position: EventPosition) -> Self {
        Self {
            position: RwLock::new(Some(position)),
        }
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self) -> Result<Option<EventPosition>, ReconcileError> {
        Ok(*self.position.read())
    }

    fn save(&self, position: EventPosition) -> Result<(), ReconcileError> {
        *self.position.write() = Some(position);
        Ok(())
    }
}
