//! # Adapters
//!
//! Store implementations. The RocksDB-backed store lives in the runtime
//! crate behind the `rocksdb` feature.

pub mod memory;

pub use memory::InMemoryTransactionStore;
