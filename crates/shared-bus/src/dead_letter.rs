//! # Dead Letter Queue
//!
//! Ledger events that could not be reconciled are parked here with the
//! error that stopped them, for operator investigation. The queue is
//! bounded; the oldest entry is evicted when full.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::{LedgerEvent, Timestamp};
use std::collections::VecDeque;
use tracing::warn;

/// A failed event and why it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    /// The event as delivered.
    pub event: LedgerEvent,
    /// Rendered error.
    pub error: String,
    /// When the failure was recorded (ms).
    pub at: Timestamp,
}

/// Bounded in-memory dead letter queue.
#[derive(Debug)]
pub struct DeadLetterQueue {
    entries: Mutex<VecDeque<DeadLetter>>,
    capacity: usize,
}

impl DeadLetterQueue {
    /// Default number of retained dead letters.
    pub const DEFAULT_CAPACITY: usize = 1_000;

    /// Create a queue holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity: capacity.max(1),
        }
    }

    /// Park an event.
    pub fn push(&self, event: LedgerEvent, error: impl Into<String>, at: Timestamp) {
        let error = error.into();
        warn!(
            kind = %event.kind,
            tx_hash = %event.transaction_hash,
            block = event.block_number,
            error = %error,
            "Ledger event routed to dead letter queue"
        );

        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(DeadLetter { event, error, at });
    }

    /// Copy of the current entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeadLetter> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Remove and return every entry.
    pub fn drain(&self) -> Vec<DeadLetter> {
        self.entries.lock().drain(..).collect()
    }

    /// Number of parked events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
