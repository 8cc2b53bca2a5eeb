//! # Adapters Module
//!
//! Checkpoint storage implementations.

pub mod memory;

pub use memory::InMemoryCheckpointStore;
