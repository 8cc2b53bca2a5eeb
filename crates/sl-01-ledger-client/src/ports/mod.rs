//! # Ports Module
//!
//! The ledger port consumed by the reliability subsystems.

pub mod outbound;

pub use outbound::*;
