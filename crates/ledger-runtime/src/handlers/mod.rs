//! # Background Workers
//!
//! Long-lived tasks the runtime spawns next to the event reconciler.
//!
//! - `BlockProducer` - mines the simulated ledger on an interval (sl-01)
//! - `StalenessMonitor` - periodic stale scan and receipt recovery (sl-04)

pub mod block_producer;
pub mod staleness;

pub use block_producer::BlockProducer;
pub use staleness::StalenessMonitor;
