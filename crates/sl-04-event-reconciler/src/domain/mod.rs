//! # Domain Module
//!
//! Reconciler errors, configuration, outcomes and counters.

pub mod errors;
pub mod value_objects;

pub use errors::*;
pub use value_objects::*;
