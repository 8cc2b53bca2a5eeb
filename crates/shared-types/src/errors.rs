//! # Error Types
//!
//! Errors shared by every subsystem that builds or reads ledger payloads.

use thiserror::Error;

/// Errors raised while building, validating, or reading call parameters
/// and event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Operation name not part of the contract vocabulary.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Wrong number of parameters for an operation.
    #[error("{operation} expects {expected} parameters, got {got}")]
    ArityMismatch {
        operation: String,
        expected: usize,
        got: usize,
    },

    /// A parameter has the wrong type.
    #[error("{operation}: parameter {param} must be {expected}, got {got}")]
    TypeMismatch {
        operation: String,
        param: String,
        expected: String,
        got: String,
    },

    /// An event payload lacks a field the binding relies on.
    #[error("{kind} event is missing field {field}")]
    MissingField { kind: String, field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_error_message() {
        let err = ParamError::ArityMismatch {
            operation: "CreateItem".to_string(),
            expected: 5,
            got: 3,
        };
        assert_eq!(err.to_string(), "CreateItem expects 5 parameters, got 3");
    }

    #[test]
    fn test_missing_field_message() {
        let err = ParamError::MissingField {
            kind: "ItemCreated".to_string(),
            field: "itemId".to_string(),
        };
        assert!(err.to_string().contains("itemId"));
    }
}
