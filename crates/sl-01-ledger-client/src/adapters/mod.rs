//! # Adapters
//!
//! Ledger implementations behind the `LedgerClient` port.

pub mod simulated;

pub use simulated::SimulatedLedger;
