//! # Runtime Configuration
//!
//! Unified configuration for all subsystems and background workers.
//!
//! Defaults suit a single development node. Every field can be overridden
//! from the environment; values that do not parse are an error, not a
//! silent fallback.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sl_03_submission_coordinator::RetryPolicy;
use sl_04_event_reconciler::ReconcilerConfig;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Contract and block production.
    pub ledger: LedgerConfig,
    /// Submission retries.
    pub submission: SubmissionConfig,
    /// Event reconciliation and staleness.
    pub reconciler: ReconcilerSettings,
    /// Persistence.
    pub storage: StorageConfig,
    /// Domain adapters.
    pub domain: DomainConfig,
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable holds an unparseable value.
    #[error("{key}={value:?} is not a valid value")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// Values parse but do not fit together.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Address of the supply-chain contract.
    pub contract_address: String,
    /// How often the simulated ledger mines pending calls.
    pub block_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract_address: "0x5c0ffee000000000000000000000000000000001".to_string(),
            block_interval: Duration::from_secs(2),
        }
    }
}

/// Submission configuration.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// Transport failures tolerated per record.
    pub max_retries: u32,
    /// First backoff delay.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
    /// Growth factor between delays.
    pub backoff_multiplier: f64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_backoff: policy.initial_backoff,
            max_backoff: policy.max_backoff,
            backoff_multiplier: policy.multiplier,
        }
    }
}

impl SubmissionConfig {
    /// Retry policy for the coordinator.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(self.max_retries)
            .with_initial_backoff(self.initial_backoff)
            .with_multiplier(self.backoff_multiplier)
            .with_max_backoff(self.max_backoff)
    }
}

/// Reconciler and staleness monitor configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Age of a PENDING record still eligible for event matching.
    pub lookback_window: Duration,
    /// Age at which a PENDING record is reported stale.
    pub stale_threshold: Duration,
    /// Interval between staleness scans.
    pub stale_scan_interval: Duration,
    /// Retained unreconcilable events.
    pub dead_letter_capacity: usize,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        let defaults = ReconcilerConfig::default();
        Self {
            lookback_window: defaults.lookback_window,
            stale_threshold: Duration::from_secs(10 * 60),
            stale_scan_interval: Duration::from_secs(60),
            dead_letter_capacity: defaults.dead_letter_capacity,
        }
    }
}

impl ReconcilerSettings {
    /// Configuration for the reconciler service.
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            lookback_window: self.lookback_window,
            dead_letter_capacity: self.dead_letter_capacity,
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory; lost on restart.
    Memory,
    /// RocksDB under `data_dir` (requires the `rocksdb` feature).
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::RocksDb),
            _ => Err(()),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Backend for records, entities and the checkpoint.
    pub backend: StorageBackend,
    /// Data directory for durable backends.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Domain adapter configuration.
#[derive(Debug, Clone)]
pub struct DomainConfig {
    /// Lifetime of a cached authorization lookup.
    pub auth_cache_ttl: Duration,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            auth_cache_ttl: Duration::from_secs(30),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden from the process environment.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `SL_CONTRACT_ADDRESS` | `ledger.contract_address` |
    /// | `SL_BLOCK_INTERVAL_MS` | `ledger.block_interval` |
    /// | `SL_MAX_RETRIES` | `submission.max_retries` |
    /// | `SL_INITIAL_BACKOFF_MS` | `submission.initial_backoff` |
    /// | `SL_MAX_BACKOFF_MS` | `submission.max_backoff` |
    /// | `SL_BACKOFF_MULTIPLIER` | `submission.backoff_multiplier` |
    /// | `SL_LOOKBACK_WINDOW_SECS` | `reconciler.lookback_window` |
    /// | `SL_STALE_THRESHOLD_SECS` | `reconciler.stale_threshold` |
    /// | `SL_STALE_SCAN_INTERVAL_SECS` | `reconciler.stale_scan_interval` |
    /// | `SL_STORAGE` | `storage.backend` (`memory`, `rocksdb`) |
    /// | `SL_DATA_DIR` | `storage.data_dir` |
    /// | `SL_AUTH_CACHE_TTL_SECS` | `domain.auth_cache_ttl` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(address) = lookup("SL_CONTRACT_ADDRESS") {
            config.ledger.contract_address = address;
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "SL_BLOCK_INTERVAL_MS")? {
            config.ledger.block_interval = Duration::from_millis(ms);
        }

        if let Some(retries) = parsed(&lookup, "SL_MAX_RETRIES")? {
            config.submission.max_retries = retries;
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "SL_INITIAL_BACKOFF_MS")? {
            config.submission.initial_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "SL_MAX_BACKOFF_MS")? {
            config.submission.max_backoff = Duration::from_millis(ms);
        }
        if let Some(multiplier) = parsed(&lookup, "SL_BACKOFF_MULTIPLIER")? {
            config.submission.backoff_multiplier = multiplier;
        }

        if let Some(secs) = parsed::<u64, _>(&lookup, "SL_LOOKBACK_WINDOW_SECS")? {
            config.reconciler.lookback_window = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed::<u64, _>(&lookup, "SL_STALE_THRESHOLD_SECS")? {
            config.reconciler.stale_threshold = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed::<u64, _>(&lookup, "SL_STALE_SCAN_INTERVAL_SECS")? {
            config.reconciler.stale_scan_interval = Duration::from_secs(secs);
        }

        if let Some(backend) = parsed(&lookup, "SL_STORAGE")? {
            config.storage.backend = backend;
        }
        if let Some(dir) = lookup("SL_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }

        if let Some(secs) = parsed::<u64, _>(&lookup, "SL_AUTH_CACHE_TTL_SECS")? {
            config.domain.auth_cache_ttl = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the values fit together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let address = &self.ledger.contract_address;
        if !address.starts_with("0x") || address.len() < 3 {
            return Err(ConfigError::Invalid(format!(
                "contract address {address:?} must be 0x-prefixed"
            )));
        }
        if self.ledger.block_interval.is_zero() {
            return Err(ConfigError::Invalid("block interval must be positive".into()));
        }
        if self.submission.initial_backoff > self.submission.max_backoff {
            return Err(ConfigError::Invalid(format!(
                "initial backoff {:?} exceeds max backoff {:?}",
                self.submission.initial_backoff, self.submission.max_backoff
            )));
        }
        if self.submission.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "backoff multiplier must be at least 1.0".into(),
            ));
        }
        if self.reconciler.stale_scan_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "stale scan interval must be positive".into(),
            ));
        }
        if self.reconciler.stale_threshold.is_zero() {
            return Err(ConfigError::Invalid("stale threshold must be positive".into()));
        }
        if self.storage.backend == StorageBackend::RocksDb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::Invalid(
                "rocksdb storage requires the `rocksdb` feature".into(),
            ));
        }
        Ok(())
    }
}

fn parsed<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.submission.max_retries, 3);
        assert_eq!(config.reconciler.lookback_window, Duration::from_secs(86_400));
        assert_eq!(config.reconciler.stale_threshold, Duration::from_secs(600));
        assert_eq!(config.domain.auth_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_env_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("SL_MAX_RETRIES", "5"),
            ("SL_INITIAL_BACKOFF_MS", "100"),
            ("SL_MAX_BACKOFF_MS", "1000"),
            ("SL_STALE_THRESHOLD_SECS", "30"),
            ("SL_LOOKBACK_WINDOW_SECS", "3600"),
            ("SL_CONTRACT_ADDRESS", "0xabc"),
            ("SL_DATA_DIR", "/var/lib/ledger"),
        ]))
        .unwrap();

        let policy = config.submission.retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_backoff, Duration::from_millis(100));
        assert_eq!(policy.max_backoff, Duration::from_secs(1));
        assert_eq!(config.reconciler.stale_threshold, Duration::from_secs(30));
        assert_eq!(
            config.reconciler.reconciler_config().lookback_window,
            Duration::from_secs(3600)
        );
        assert_eq!(config.ledger.contract_address, "0xabc");
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/ledger"));
    }

    #[test]
    fn test_unparseable_value_rejected() {
        let err = RuntimeConfig::from_lookup(lookup(&[("SL_MAX_RETRIES", "many")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "SL_MAX_RETRIES",
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn test_inconsistent_values_rejected() {
        let err = RuntimeConfig::from_lookup(lookup(&[
            ("SL_INITIAL_BACKOFF_MS", "5000"),
            ("SL_MAX_BACKOFF_MS", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err =
            RuntimeConfig::from_lookup(lookup(&[("SL_CONTRACT_ADDRESS", "c0ffee")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("RocksDB".parse::<StorageBackend>(), Ok(StorageBackend::RocksDb));
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("sqlite".parse::<StorageBackend>().is_err());

        let result = RuntimeConfig::from_lookup(lookup(&[("SL_STORAGE", "rocksdb")]));
        if cfg!(feature = "rocksdb") {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(ConfigError::Invalid(_))));
        }
    }
}
