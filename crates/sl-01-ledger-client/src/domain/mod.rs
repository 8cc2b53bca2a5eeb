//! # Domain Module
//!
//! Contract binding, failure classification, and receipts.

pub mod binding;
pub mod errors;
pub mod value_objects;

pub use binding::*;
pub use errors::*;
pub use value_objects::*;
