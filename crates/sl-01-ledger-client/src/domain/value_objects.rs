//! Value objects returned by the ledger.

use serde::{Deserialize, Serialize};
use shared_types::{ExternalRef, LedgerEvent};

/// Execution status carried by a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    /// Executed; events were emitted.
    Success,
    /// Mined but reverted; no events.
    Reverted,
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash.
    pub transaction_hash: ExternalRef,
    /// Block that included the transaction.
    pub block_number: u64,
    /// Execution status.
    pub status: ReceiptStatus,
    /// Events emitted by the transaction, in log order.
    pub events: Vec<LedgerEvent>,
    /// Revert reason, when known.
    pub revert_reason: Option<String>,
}

impl Receipt {
    /// True if the transaction executed.
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Summary of a block produced by the simulated ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinedBlock {
    /// Block number.
    pub number: u64,
    /// Transactions included, in order.
    pub transactions: Vec<ExternalRef>,
    /// Events emitted, in log order.
    pub events: Vec<LedgerEvent>,
}
