//! # Domain Errors
//!
//! Failure classification for ledger submissions and ledger queries.

use serde::{Deserialize, Serialize};
use shared_types::ParamError;
use std::fmt;
use thiserror::Error;

/// Kind of a retryable transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    /// The node did not answer in time.
    Timeout,
    /// The connection dropped mid-request.
    ConnectionReset,
    /// Fee too low for the current pool; resubmission may succeed.
    Underpriced,
    /// The node is temporarily unavailable.
    Unavailable,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportKind::Timeout => "timeout",
            TransportKind::ConnectionReset => "connection reset",
            TransportKind::Underpriced => "underpriced",
            TransportKind::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// Outcome of a failed `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Synchronous rejection by the network (malformed parameters,
    /// insufficient funds, nonce conflict, revert on estimate). Not retryable.
    #[error("Rejected by ledger: {reason}")]
    Rejected {
        /// Reason reported by the network.
        reason: String,
    },

    /// Transport-level failure. Retryable.
    #[error("Transport failure ({kind}): {message}")]
    Transport {
        /// Failure kind.
        kind: TransportKind,
        /// Diagnostic message.
        message: String,
    },
}

impl SubmissionError {
    /// Shorthand for a rejection.
    pub fn rejected(reason: impl Into<String>) -> Self {
        SubmissionError::Rejected {
            reason: reason.into(),
        }
    }

    /// Shorthand for a transport failure.
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        SubmissionError::Transport {
            kind,
            message: message.into(),
        }
    }

    /// True for transport failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmissionError::Transport { .. })
    }
}

impl From<ParamError> for SubmissionError {
    fn from(err: ParamError) -> Self {
        SubmissionError::Rejected {
            reason: err.to_string(),
        }
    }
}

/// Errors from ledger queries (subscription, receipts, block height).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerClientError {
    /// The ledger could not be reached.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger returned data the binding cannot interpret.
    #[error("Malformed ledger data: {0}")]
    Malformed(#[from] ParamError),
}
