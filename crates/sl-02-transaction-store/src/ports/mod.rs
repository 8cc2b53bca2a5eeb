//! # Ports Module
//!
//! Persistence port for transaction records.

pub mod outbound;

pub use outbound::*;
