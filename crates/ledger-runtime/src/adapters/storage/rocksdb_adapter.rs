//! # RocksDB Storage Adapter
//!
//! Durable implementations of the record, entity and checkpoint stores.
//!
//! ## Column Families
//!
//! - `transactions` - `TransactionRecord` rows keyed by record id (sl-02)
//! - `chains` - supply chains keyed by chain id (sl-05)
//! - `authorizations` - keyed by chain id, then participant (sl-05)
//! - `items` - items keyed by item id (sl-05)
//! - `metadata` - reconciler checkpoint (sl-04)
//!
//! Rows are JSON. Integer keys are big-endian so iteration follows id order.
//! Writes of a record are serialized so the version check and the put are
//! one step.

use parking_lot::Mutex;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteOptions, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{EventPosition, RecordId};
use sl_02_transaction_store::{StoreError, TransactionRecord, TransactionStore};
use sl_04_event_reconciler::{CheckpointStore, ReconcileError};
use sl_05_domain_adapters::{Authorization, DomainError, EntityStore, Item, SupplyChain};
use std::path::PathBuf;
use std::sync::Arc;

/// Column family names
pub const CF_TRANSACTIONS: &str = "transactions";
pub const CF_CHAINS: &str = "chains";
pub const CF_AUTHORIZATIONS: &str = "authorizations";
pub const CF_ITEMS: &str = "items";
pub const CF_METADATA: &str = "metadata";

/// All column families used by the runtime
pub const COLUMN_FAMILIES: &[&str] = &[
    CF_TRANSACTIONS,
    CF_CHAINS,
    CF_AUTHORIZATIONS,
    CF_ITEMS,
    CF_METADATA,
];

const CHECKPOINT_KEY: &[u8] = b"reconciler_checkpoint";

/// RocksDB configuration
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 16MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write (default: true for durability)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/rocksdb"),
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 16 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Create config for testing (smaller buffers, no sync)
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 4 * 1024 * 1024,
            write_buffer_size: 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// Shared RocksDB handle with JSON row helpers.
pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
    write_lock: Mutex<()>,
}

impl RocksDbStore {
    /// Open or create the database
    pub fn open(config: RocksDbConfig) -> Result<Self, String> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| format!("Failed to open RocksDB at {}: {e}", config.path.display()))?;

        Ok(Self {
            db,
            config,
            write_lock: Mutex::new(()),
        })
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }

    fn get_row<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>, String> {
        let handle = self
            .db
            .cf_handle(cf)
            .ok_or_else(|| format!("missing column family {cf}"))?;
        match self
            .db
            .get_cf(handle, key)
            .map_err(|e| format!("RocksDB get failed: {e}"))?
        {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| format!("corrupt row in {cf}: {e}")),
            None => Ok(None),
        }
    }

    fn put_row<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<(), String> {
        let handle = self
            .db
            .cf_handle(cf)
            .ok_or_else(|| format!("missing column family {cf}"))?;
        let bytes = serde_json::to_vec(value).map_err(|e| format!("encode failed: {e}"))?;
        self.db
            .put_cf_opt(handle, key, bytes, &self.write_options())
            .map_err(|e| format!("RocksDB put failed: {e}"))
    }

    fn scan_rows<T: DeserializeOwned>(&self, cf: &str, prefix: &[u8]) -> Result<Vec<T>, String> {
        let handle = self
            .db
            .cf_handle(cf)
            .ok_or_else(|| format!("missing column family {cf}"))?;
        let mode = if prefix.is_empty() {
            IteratorMode::Start
        } else {
            IteratorMode::From(prefix, Direction::Forward)
        };

        let mut rows = Vec::new();
        for item in self.db.iterator_cf(handle, mode) {
            let (key, value) = item.map_err(|e| format!("RocksDB scan failed: {e}"))?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push(
                serde_json::from_slice(&value).map_err(|e| format!("corrupt row in {cf}: {e}"))?,
            );
        }
        Ok(rows)
    }
}

fn record_key(id: RecordId) -> Vec<u8> {
    id.to_string().into_bytes()
}

fn authorization_key(chain_id: u64, participant: &str) -> Vec<u8> {
    let mut key = chain_id.to_be_bytes().to_vec();
    key.extend_from_slice(participant.as_bytes());
    key
}

// =============================================================================
// Transaction records (sl-02)
// =============================================================================

/// `TransactionStore` over the `transactions` column family.
pub struct RocksDbTransactionStore {
    store: Arc<RocksDbStore>,
}

impl RocksDbTransactionStore {
    /// Records stored in `store`.
    pub fn new(store: Arc<RocksDbStore>) -> Self {
        Self { store }
    }
}

impl TransactionStore for RocksDbTransactionStore {
    fn create(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let _guard = self.store.write_lock.lock();
        let key = record_key(record.id);
        let existing: Option<TransactionRecord> = self
            .store
            .get_row(CF_TRANSACTIONS, &key)
            .map_err(StoreError::Backend)?;
        if existing.is_some() {
            return Err(StoreError::AlreadyExists(record.id));
        }
        self.store
            .put_row(CF_TRANSACTIONS, &key, record)
            .map_err(StoreError::Backend)
    }

    fn get(&self, id: RecordId) -> Result<Option<TransactionRecord>, StoreError> {
        self.store
            .get_row(CF_TRANSACTIONS, &record_key(id))
            .map_err(StoreError::Backend)
    }

    fn update(&self, record: &TransactionRecord) -> Result<TransactionRecord, StoreError> {
        let _guard = self.store.write_lock.lock();
        let key = record_key(record.id);
        let stored: TransactionRecord = self
            .store
            .get_row(CF_TRANSACTIONS, &key)
            .map_err(StoreError::Backend)?
            .ok_or(StoreError::NotFound(record.id))?;

        if stored.version != record.version {
            return Err(StoreError::ConcurrentConflict {
                id: record.id,
                expected: record.version,
                actual: stored.version,
            });
        }

        let mut next = record.clone();
        next.version += 1;
        self.store
            .put_row(CF_TRANSACTIONS, &key, &next)
            .map_err(StoreError::Backend)?;
        Ok(next)
    }

    fn scan(
        &self,
        predicate: &dyn Fn(&TransactionRecord) -> bool,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut found: Vec<TransactionRecord> = self
            .store
            .scan_rows(CF_TRANSACTIONS, &[])
            .map_err(StoreError::Backend)?
            .into_iter()
            .filter(|r| predicate(r))
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

// =============================================================================
// Business entities (sl-05)
// =============================================================================

/// `EntityStore` over the `chains`, `authorizations` and `items` column
/// families.
pub struct RocksDbEntityStore {
    store: Arc<RocksDbStore>,
}

impl RocksDbEntityStore {
    /// Entities stored in `store`.
    pub fn new(store: Arc<RocksDbStore>) -> Self {
        Self { store }
    }
}

impl EntityStore for RocksDbEntityStore {
    fn load_chain(&self, id: u64) -> Result<Option<SupplyChain>, DomainError> {
        self.store
            .get_row(CF_CHAINS, &id.to_be_bytes())
            .map_err(DomainError::Store)
    }

    fn save_chain(&self, chain: &SupplyChain) -> Result<(), DomainError> {
        self.store
            .put_row(CF_CHAINS, &chain.id.to_be_bytes(), chain)
            .map_err(DomainError::Store)
    }

    fn load_authorization(
        &self,
        chain_id: u64,
        participant: &str,
    ) -> Result<Option<Authorization>, DomainError> {
        self.store
            .get_row(CF_AUTHORIZATIONS, &authorization_key(chain_id, participant))
            .map_err(DomainError::Store)
    }

    fn save_authorization(&self, authorization: &Authorization) -> Result<(), DomainError> {
        self.store
            .put_row(
                CF_AUTHORIZATIONS,
                &authorization_key(authorization.chain_id, &authorization.participant),
                authorization,
            )
            .map_err(DomainError::Store)
    }

    fn list_authorizations(&self, chain_id: u64) -> Result<Vec<Authorization>, DomainError> {
        self.store
            .scan_rows(CF_AUTHORIZATIONS, &chain_id.to_be_bytes())
            .map_err(DomainError::Store)
    }

    fn load_item(&self, id: u64) -> Result<Option<Item>, DomainError> {
        self.store
            .get_row(CF_ITEMS, &id.to_be_bytes())
            .map_err(DomainError::Store)
    }

    fn save_item(&self, item: &Item) -> Result<(), DomainError> {
        self.store
            .put_row(CF_ITEMS, &item.id.to_be_bytes(), item)
            .map_err(DomainError::Store)
    }
}

// =============================================================================
// Reconciler checkpoint (sl-04)
// =============================================================================

/// `CheckpointStore` over the `metadata` column family.
pub struct RocksDbCheckpointStore {
    store: Arc<RocksDbStore>,
}

impl RocksDbCheckpointStore {
    /// Checkpoint stored in `store`.
    pub fn new(store: Arc<RocksDbStore>) -> Self {
        Self { store }
    }
}

impl CheckpointStore for RocksDbCheckpointStore {
    fn load(&self) -> Result<Option<EventPosition>, ReconcileError> {
        self.store
            .get_row(CF_METADATA, CHECKPOINT_KEY)
            .map_err(ReconcileError::Checkpoint)
    }

    fn save(&self, position: EventPosition) -> Result<(), ReconcileError> {
        self.store
            .put_row(CF_METADATA, CHECKPOINT_KEY, &position)
            .map_err(ReconcileError::Checkpoint)
    }
}
