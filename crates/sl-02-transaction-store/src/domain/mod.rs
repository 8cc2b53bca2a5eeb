//! # Domain Module
//!
//! The transaction record, its lifecycle invariants, and store errors.

pub mod entities;
pub mod errors;
pub mod invariants;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
