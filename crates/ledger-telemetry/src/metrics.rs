//! Prometheus metrics for the supply-ledger subsystems.
//!
//! All metrics follow the naming convention: `sl_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., submissions_resolved_total)
//! - **Gauge**: Value that can go up or down (e.g., stale_pending)

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SUBMISSION METRICS (Subsystem 3)
    // =========================================================================

    /// Submissions reaching CONFIRMED or FAILED
    pub static ref SUBMISSIONS_RESOLVED: CounterVec = CounterVec::new(
        Opts::new("sl_submissions_resolved_total", "Submissions resolved by operation and outcome"),
        &["operation", "outcome"]  // outcome: confirmed/failed
    ).expect("metric creation failed");

    /// Transport failures seen while submitting
    pub static ref TRANSPORT_FAILURES: CounterVec = CounterVec::new(
        Opts::new("sl_submissions_transport_failures_total", "Retryable transport failures"),
        &["operation"]
    ).expect("metric creation failed");

    /// Submissions recorded REDUNDANT
    pub static ref REDUNDANT_SUBMISSIONS: CounterVec = CounterVec::new(
        Opts::new("sl_submissions_redundant_total", "Submissions that followed an identical in-flight one"),
        &["operation"]
    ).expect("metric creation failed");

    // =========================================================================
    // RECONCILIATION METRICS (Subsystem 4)
    // =========================================================================

    /// Events processed by outcome
    pub static ref EVENTS_RECONCILED: CounterVec = CounterVec::new(
        Opts::new("sl_reconciler_events_total", "Ledger events processed by kind and outcome"),
        &["kind", "outcome"]  // outcome: confirmed/unmatched/duplicate/ignored
    ).expect("metric creation failed");

    /// Events that could not be processed
    pub static ref RECONCILIATION_ERRORS: CounterVec = CounterVec::new(
        Opts::new("sl_reconciler_errors_total", "Ledger events parked in the dead letter queue"),
        &["kind"]
    ).expect("metric creation failed");

    /// PENDING records older than the staleness threshold
    pub static ref STALE_PENDING: Gauge = Gauge::new(
        "sl_reconciler_stale_pending",
        "PENDING records older than the staleness threshold at the last scan"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Safe to call twice.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Submissions
        Box::new(SUBMISSIONS_RESOLVED.clone()),
        Box::new(TRANSPORT_FAILURES.clone()),
        Box::new(REDUNDANT_SUBMISSIONS.clone()),
        // Reconciliation
        Box::new(EVENTS_RECONCILED.clone()),
        Box::new(RECONCILIATION_ERRORS.clone()),
        Box::new(STALE_PENDING.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
