//! # Shared Types Crate
//!
//! Vocabulary shared by every supply-ledger subsystem: operations and their
//! parameters, canonical encoding and fingerprints, the persisted status
//! strings, ledger events, time sources, and the explicit TTL cache.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-subsystem type is defined here.
//! - **Stable Strings**: `TxStatus` and `LedgerStatus` serialize to the
//!   persisted vocabulary (`PENDING`, `CONFIRMED`, `FAILED`, `REDUNDANT`).
//! - **Canonical Encoding**: parameters have exactly one string form, so
//!   fingerprints computed at submission time match those derived from events.

pub mod entities;
pub mod errors;
pub mod time;
pub mod ttl_cache;

pub use entities::*;
pub use errors::*;
pub use time::{MockTimeSource, SystemTimeSource, TimeSource};
pub use ttl_cache::TtlCache;
