//! # Time-Bounded Cache
//!
//! Explicit cache component for derived lookups (participant authorization,
//! local-to-ledger identifier associations). Entries expire after a fixed
//! TTL and can be invalidated explicitly by the component that owns the
//! cache. No entry is authoritative beyond its TTL.
//!
//! ## Design
//!
//! - Each entry remembers when it was inserted
//! - Reads past the TTL miss and drop the entry
//! - Expired entries are garbage-collected on writes, at most once per
//!   `gc_interval_ms`

use std::collections::HashMap;
use std::hash::Hash;

use crate::entities::Timestamp;

/// Entry with its insertion time.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Timestamp,
}

/// Time-bounded key/value cache.
///
/// Timestamps are supplied by the caller (from a `TimeSource`) so that the
/// cache itself never reads the wall clock.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl_ms: u64,
    gc_interval_ms: u64,
    last_gc: Timestamp,
    hits: u64,
    misses: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Default time to live: 30 seconds.
    pub const DEFAULT_TTL_MS: u64 = 30_000;

    /// Default garbage collection interval.
    pub const DEFAULT_GC_INTERVAL_MS: u64 = 10_000;

    /// Create a cache with the given TTL.
    #[must_use]
    pub fn new(ttl_ms: u64) -> Self {
        Self::with_config(ttl_ms, Self::DEFAULT_GC_INTERVAL_MS)
    }

    /// Create a cache with custom TTL and GC interval.
    #[must_use]
    pub fn with_config(ttl_ms: u64, gc_interval_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_ms,
            gc_interval_ms,
            last_gc: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a live entry. Expired entries are dropped and count as misses.
    pub fn get(&mut self, key: &K, now: Timestamp) -> Option<V> {
        let live = match self.entries.get(key) {
            Some(entry) if !self.is_expired(entry.inserted_at, now) => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        };

        if live.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        live
    }

    /// Insert or refresh an entry.
    pub fn insert(&mut self, key: K, value: V, now: Timestamp) {
        if now.saturating_sub(self.last_gc) > self.gc_interval_ms {
            self.purge_expired(now);
            self.last_gc = now;
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    /// Drop one entry. Returns true when something was removed.
    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every entry whose key matches.
    pub fn invalidate_where(&mut self, mut predicate: impl FnMut(&K) -> bool) {
        self.entries.retain(|k, _| !predicate(k));
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove expired entries.
    pub fn purge_expired(&mut self, now: Timestamp) {
        let ttl = self.ttl_ms;
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.inserted_at) < ttl);
    }

    /// Number of stored entries, live or not yet collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    fn is_expired(&self, inserted_at: Timestamp, now: Timestamp) -> bool {
        now.saturating_sub(inserted_at) >= self.ttl_ms
    }
}
