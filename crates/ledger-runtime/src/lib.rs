//! # Ledger Runtime Library
//!
//! Wiring for the supply-ledger service. The `main.rs` binary builds a
//! [`LedgerRuntime`] from the environment; tests build one from explicit
//! parts.
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and the subsystem container
//! - `adapters/` - Prometheus metrics sink and storage backends
//! - `handlers/` - background workers (block producer, staleness monitor)
//! - `runtime.rs` - worker lifecycle and graceful shutdown
//!
//! ## Workers
//!
//! | Worker | Subsystem | Stops on |
//! |--------|-----------|----------|
//! | Event reconciler | sl-04 | shutdown signal, stream end |
//! | Staleness monitor | sl-04 | shutdown signal |
//! | Block producer | sl-01 (simulated ledger) | shutdown signal |
//!
//! Submission tasks (sl-03) are spawned per intent and end on their own.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;

// Re-exports
pub use adapters::{PrometheusMetrics, Storage};
pub use container::{ConfigError, ContainerError, LedgerContainer, RuntimeConfig};
pub use runtime::LedgerRuntime;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
