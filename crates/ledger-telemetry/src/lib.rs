//! # Ledger Telemetry
//!
//! Logging and metrics for the supply-ledger services.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON lines
//! - **Metrics**: Prometheus counters and gauges in a global registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // Subsystem logs and metrics are now collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SL_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `SL_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `SL_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `SL_METRICS_PORT` | `9100` | Prometheus port |
//! | `SL_SERVICE_NAME` | `supply-ledger` | Service name |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    gather_metrics, register_metrics, EVENTS_RECONCILED, RECONCILIATION_ERRORS,
    REDUNDANT_SUBMISSIONS, STALE_PENDING, SUBMISSIONS_RESOLVED, TRANSPORT_FAILURES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A metric could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Unusable configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install the global subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
