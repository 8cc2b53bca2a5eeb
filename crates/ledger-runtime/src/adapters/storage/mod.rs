//! # Production Storage Adapters
//!
//! Durable backends for the record, entity and checkpoint stores.
//!
//! ## Usage
//!
//! Enable the `rocksdb` feature and select the backend at startup:
//!
//! ```toml
//! ledger-runtime = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! ```text
//! SL_STORAGE=rocksdb SL_DATA_DIR=/var/lib/supply-ledger ledger-runtime
//! ```
//!
//! Without the feature every store lives in process memory.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{
    RocksDbCheckpointStore, RocksDbConfig, RocksDbEntityStore, RocksDbStore,
    RocksDbTransactionStore, COLUMN_FAMILIES,
};

use crate::container::{StorageBackend, StorageConfig};
use sl_02_transaction_store::{InMemoryTransactionStore, TransactionStore};
use sl_04_event_reconciler::{CheckpointStore, InMemoryCheckpointStore};
use sl_05_domain_adapters::{EntityStore, InMemoryEntityStore};
use std::sync::Arc;
use tracing::info;

/// The three persistence ports, from one backend.
#[derive(Clone)]
pub struct Storage {
    /// Submission records.
    pub records: Arc<dyn TransactionStore>,
    /// Business entities.
    pub entities: Arc<dyn EntityStore>,
    /// Reconciler checkpoint.
    pub checkpoints: Arc<dyn CheckpointStore>,
}

impl Storage {
    /// Fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            records: Arc::new(InMemoryTransactionStore::new()),
            entities: Arc::new(InMemoryEntityStore::new()),
            checkpoints: Arc::new(InMemoryCheckpointStore::new()),
        }
    }

    /// Open the configured backend.
    pub fn open(config: &StorageConfig) -> Result<Self, String> {
        match config.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Ok(Self::in_memory())
            }
            StorageBackend::RocksDb => Self::open_rocksdb(config),
        }
    }

    #[cfg(feature = "rocksdb")]
    fn open_rocksdb(config: &StorageConfig) -> Result<Self, String> {
        let path = config.data_dir.join("rocksdb");
        info!(path = %path.display(), "Opening RocksDB storage");
        let store = Arc::new(RocksDbStore::open(RocksDbConfig {
            path,
            ..RocksDbConfig::default()
        })?);
        Ok(Self {
            records: Arc::new(RocksDbTransactionStore::new(Arc::clone(&store))),
            entities: Arc::new(RocksDbEntityStore::new(Arc::clone(&store))),
            checkpoints: Arc::new(RocksDbCheckpointStore::new(store)),
        })
    }

    #[cfg(not(feature = "rocksdb"))]
    fn open_rocksdb(_config: &StorageConfig) -> Result<Self, String> {
        Err("rocksdb storage requires the `rocksdb` feature".to_string())
    }
}
