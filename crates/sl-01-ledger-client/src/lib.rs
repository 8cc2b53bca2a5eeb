//! # SL-01 Ledger Client
//!
//! Boundary to the external append-only ledger hosting the supply-chain
//! contract.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Submit named contract operations and classify failures
//! - Stream contract events from a given block onward
//! - Look up receipts of mined transactions
//!
//! ## Failure Classification
//!
//! | Error | Examples | Retryable |
//! |-------|----------|-----------|
//! | `Rejected` | malformed parameters, insufficient funds, nonce conflict | No |
//! | `Transport` | timeout, connection reset, underpriced, unavailable | Yes |
//!
//! Acceptance (`Ok(tx_hash)`) means the call entered the pending pool. It
//! says nothing about execution.
//!
//! ## Module Structure
//!
//! ```text
//! sl-01-ledger-client/
//! ├── domain/          # ContractBinding, SubmissionError, Receipt
//! ├── ports/           # LedgerClient, MockLedgerClient
//! └── adapters/        # SimulatedLedger
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::SimulatedLedger;
pub use domain::{
    ContractBinding, LedgerClientError, MinedBlock, ParamSpec, ParamType, Receipt, ReceiptStatus,
    SubmissionError, SupplyChainContract, TransportKind,
};
pub use ports::{LedgerClient, LedgerEventStream, MockLedgerClient};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
