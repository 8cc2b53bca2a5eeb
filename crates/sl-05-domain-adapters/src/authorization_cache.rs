//! # Authorization Cache
//!
//! "Is this participant authorized on this chain" answers, kept for a short
//! TTL. Owned by the chain-registration side, which invalidates entries
//! whenever an authorization or chain changes state.

use parking_lot::Mutex;
use shared_types::{TimeSource, TtlCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

type Key = (u64, String);

/// TTL cache of authorization lookups.
pub struct AuthorizationCache {
    entries: Mutex<TtlCache<Key, bool>>,
    time: Arc<dyn TimeSource>,
}

impl AuthorizationCache {
    /// Default entry lifetime.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

    /// Cache whose entries live for `ttl`.
    pub fn new(ttl: Duration, time: Arc<dyn TimeSource>) -> Self {
        Self {
            entries: Mutex::new(TtlCache::new(ttl.as_millis() as u64)),
            time,
        }
    }

    /// Cached answer, if still live.
    pub fn get(&self, chain_id: u64, participant: &str) -> Option<bool> {
        let now = self.time.now();
        self.entries
            .lock()
            .get(&(chain_id, participant.to_string()), now)
    }

    /// Remember an answer.
    pub fn insert(&self, chain_id: u64, participant: &str, authorized: bool) {
        let now = self.time.now();
        self.entries
            .lock()
            .insert((chain_id, participant.to_string()), authorized, now);
    }

    /// Forget one participant's answer.
    pub fn invalidate(&self, chain_id: u64, participant: &str) {
        trace!(chain_id, participant, "[sl-05] Authorization cache entry invalidated");
        self.entries
            .lock()
            .invalidate(&(chain_id, participant.to_string()));
    }

    /// Forget every answer for a chain.
    pub fn invalidate_chain(&self, chain_id: u64) {
        self.entries
            .lock()
            .invalidate_where(|(id, _)| *id == chain_id);
    }
}
