//! # SL-02 Transaction Store
//!
//! Durable record of every submission to the ledger.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! One `TransactionRecord` per logical submission. Retries update the same
//! record; the record outlives the request that created it and is the sole
//! place the coordinator and the reconciler meet.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Monotonic status | `invariant_monotonic_status` in every transition |
//! | Write-once reference | `invariant_reference_write_once` in `accept` |
//! | Immutable parameters | no mutator exposes `parameters` |
//! | Serialized writers | version check in `update`, retried by `modify` |
//!
//! ## Module Structure
//!
//! ```text
//! sl-02-transaction-store/
//! ├── domain/          # TransactionRecord, StoreError, invariants
//! ├── ports/           # TransactionStore
//! ├── adapters/        # InMemoryTransactionStore
//! └── service.rs       # modify() read-modify-write helper
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::InMemoryTransactionStore;
pub use domain::{
    invariant_monotonic_status, invariant_reference_write_once, StoreError, TransactionRecord,
};
pub use ports::TransactionStore;
pub use service::{modify, MAX_MODIFY_ATTEMPTS};
