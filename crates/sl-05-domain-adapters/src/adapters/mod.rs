//! # Adapters Module
//!
//! Entity store implementations.

pub mod memory;

pub use memory::InMemoryEntityStore;
