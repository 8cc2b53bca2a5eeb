//! # SL-05 Domain Adapters
//!
//! Supply chains, participants and items, mirrored locally and registered
//! on the ledger.
//!
//! **Subsystem ID:** 5
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Validate business intents against the local mirror before anything is
//!   recorded
//! - Write the optimistic mutation in the same unit of work as the record
//! - Compensate the mutation when the ledger never applies it
//! - Apply ledger-originated events idempotently
//!
//! ## Entity Ledger State
//!
//! ```text
//! NONE ──intent──→ PENDING ──finalizer──→ CONFIRMED
//!                     │
//!                     └────finalizer────→ FAILED (compensated)
//! ```
//!
//! Request-handling code never writes CONFIRMED or FAILED.
//!
//! ## Compensation
//!
//! | Operation | On FAILED |
//! |-----------|-----------|
//! | `CreateChain`, `AuthorizeParticipant`, `CreateItem` | entity kept, marked FAILED |
//! | `TransferItem` | sender refunded, prior status restored |
//! | `UpdateItemStatus` | prior status restored |
//! | `ProcessItem` | that parent's material restored; confirmed steps stay |
//!
//! ## Module Structure
//!
//! ```text
//! sl-05-domain-adapters/
//! ├── domain/                 # Entities, LedgerState, LedgerCall, DomainError
//! ├── ports/                  # ChainRegistrationApi, ItemLifecycleApi, EntityStore
//! ├── adapters/               # InMemoryEntityStore
//! ├── authorization_cache.rs  # TTL cache of authorization lookups
//! ├── writer.rs               # lock → prepare → write → dispatch
//! ├── chain_registration.rs   # ChainRegistrationAdapter
//! ├── item_lifecycle.rs       # ItemLifecycleAdapter
//! ├── finalizers.rs           # LedgerFinalizer implementations
//! └── service.rs              # DomainAdapters wiring
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod authorization_cache;
pub mod chain_registration;
pub mod domain;
pub mod finalizers;
pub mod item_lifecycle;
pub mod ports;
pub mod service;
pub mod writer;

#[cfg(test)]
mod test_support;

// Re-exports
pub use adapters::InMemoryEntityStore;
pub use authorization_cache::AuthorizationCache;
pub use chain_registration::ChainRegistrationAdapter;
pub use domain::{
    Allocation, AllocationIntent, AllocationState, AllocationStep, Authorization,
    CreateItemRequest, DomainError, EntityKey, Item, ItemStatus, LedgerCall, LedgerClaim,
    LedgerState, MaterialInput, PendingIntent, PendingStatusChange, PendingTransfer,
    ProcessItemRequest, SupplyChain,
};
pub use finalizers::{ChainRegistrationFinalizer, ItemLifecycleFinalizer};
pub use item_lifecycle::ItemLifecycleAdapter;
pub use ports::{ChainRegistrationApi, EntityStore, ItemLifecycleApi};
pub use service::DomainAdapters;
pub use writer::{EntityLock, IntentWriter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
