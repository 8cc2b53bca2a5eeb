//! # Domain Module
//!
//! Retry policy, outcomes, and the values passed across the coordinator API.

pub mod errors;
pub mod outcome;
pub mod retry;
pub mod value_objects;

pub use errors::*;
pub use outcome::*;
pub use retry::*;
pub use value_objects::*;
