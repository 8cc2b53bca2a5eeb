//! # Runtime Adapters
//!
//! Port implementations the runtime supplies to the subsystems.
//!
//! - `metrics` - Prometheus sink for coordinator and reconciler metrics
//! - `storage` - in-memory and RocksDB persistence

pub mod metrics;
pub mod storage;

pub use metrics::PrometheusMetrics;
pub use storage::Storage;
