//! # Domain Errors

use shared_types::ParamError;
use sl_03_submission_coordinator::CoordinatorError;
use thiserror::Error;

/// Errors raised by the domain adapters.
///
/// Validation failures are raised before any `TransactionRecord` exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Malformed or contradictory request.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind.
        kind: &'static str,
        /// Entity key.
        id: String,
    },

    /// Entity already exists with different data.
    #[error("{kind} {id} already exists")]
    AlreadyExists {
        /// Entity kind.
        kind: &'static str,
        /// Entity key.
        id: String,
    },

    /// Holder owns less than requested.
    #[error("Item {item_id}: {holder} holds {available}, requested {requested}")]
    InsufficientQuantity {
        /// Item.
        item_id: u64,
        /// Holder address.
        holder: String,
        /// Quantity held.
        available: u64,
        /// Quantity requested.
        requested: u64,
    },

    /// Participant lacks a role on the chain.
    #[error("{participant} is not authorized on supply chain {chain_id}")]
    NotAuthorized {
        /// Supply chain.
        chain_id: u64,
        /// Participant address.
        participant: String,
    },

    /// Entity store failure.
    #[error("Entity store error: {0}")]
    Store(String),

    /// Event payload unusable.
    #[error("Malformed event: {0}")]
    Malformed(#[from] ParamError),

    /// Coordinator refused the submission.
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

impl DomainError {
    /// Shorthand for `Validation`.
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    /// Shorthand for `NotFound`.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
