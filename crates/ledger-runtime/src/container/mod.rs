//! # Subsystem Container
//!
//! Central container holding all subsystem instances with proper lifetime
//! management and dependency injection.
//!
//! - Subsystems built in dependency order (ledger → coordinator → adapters
//!   → reconciler)
//! - Finalizers registered before any worker starts
//! - Persistence chosen once, shared by every subsystem

pub mod config;
pub mod subsystems;

pub use config::{
    ConfigError, DomainConfig, LedgerConfig, ReconcilerSettings, RuntimeConfig, StorageBackend,
    StorageConfig, SubmissionConfig,
};
pub use subsystems::{ContainerError, LedgerContainer};
