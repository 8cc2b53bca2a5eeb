//! # Supply Ledger Runtime
//!
//! Entry point of the supply-ledger service.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging, metrics registry)
//! 2. Load and validate configuration from the environment
//! 3. Build the subsystem container
//! 4. Start the workers
//! 5. Wait for Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use ledger_runtime::{LedgerRuntime, RuntimeConfig};
use ledger_telemetry::{gather_metrics, init_telemetry, TelemetryConfig};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    let config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;

    let runtime = LedgerRuntime::new(config).context("Failed to build runtime")?;
    runtime.start().await?;

    info!("Supply ledger is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;

    if let Ok(metrics) = gather_metrics() {
        debug!(metrics = %metrics, "Final metrics snapshot");
    }
    Ok(())
}
