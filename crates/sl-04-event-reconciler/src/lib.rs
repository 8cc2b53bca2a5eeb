//! # SL-04 Event Reconciler
//!
//! Applies ledger events back onto local records.
//!
//! **Subsystem ID:** 4
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Consume the contract's event stream in delivery order
//! - Match each event to a PENDING record and have the coordinator confirm it
//! - Apply unmatched events heuristically through the finalizers, logged
//! - Persist a checkpoint so restarts resume instead of missing events
//! - Resolve stale accepted records from their receipts
//!
//! ## Outcomes
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Confirmed` | a PENDING record matched and was confirmed |
//! | `Unmatched` | no record; applied through `on_unmatched` |
//! | `Duplicate` | replay, or a terminal record already carries the hash |
//! | `Ignored` | foreign contract, or nothing handles the operation |
//!
//! ## Module Structure
//!
//! ```text
//! sl-04-event-reconciler/
//! ├── domain/          # ReconcileError, ReconcileOutcome, ReconcilerStats
//! ├── ports/           # ReconcilerApi, CheckpointStore, ReconcilerMetrics
//! ├── adapters/        # InMemoryCheckpointStore
//! └── service.rs       # EventReconciler
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::InMemoryCheckpointStore;
pub use domain::{
    ReconcileError, ReconcileOutcome, ReconcilerConfig, ReconcilerStats, RecoveryReport,
};
pub use ports::{CheckpointStore, NoopReconcilerMetrics, ReconcilerApi, ReconcilerMetrics};
pub use service::EventReconciler;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
