//! # SL-03 Submission Coordinator
//!
//! Drives each intent from "requested" to "accepted by the ledger" and
//! owns every status transition of a `TransactionRecord`.
//!
//! **Subsystem ID:** 3
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Deduplicate identical in-flight intents (REDUNDANT records)
//! - Retry transport failures with bounded exponential backoff
//! - Never resubmit once the ledger accepted a call
//! - Resolve outcome futures on CONFIRMED or FAILED
//! - Invoke per-operation finalizers after every terminal transition
//!
//! ## Submission Flow
//!
//! ```text
//! caller ──prepare()──→ PENDING record ──(optimistic entity write)──→ dispatch()
//!                                                                        │
//!                              ┌─────────────────────────────────────────┘
//!                              ▼
//!                     background drive(): submit / retry / fail
//!                              │
//!            reconciler ──confirm()──→ CONFIRMED ──→ finalizer.on_confirmed
//! ```
//!
//! ## Failure Reasons
//!
//! | Cause | Stored reason |
//! |-------|---------------|
//! | Non-retryable rejection | `rejected: ...` |
//! | Retry budget exhausted | `max retries exceeded ...` |
//! | Receipt shows a revert | `reverted: ...` |
//! | Operator | `abandoned: ...` |
//!
//! ## Module Structure
//!
//! ```text
//! sl-03-submission-coordinator/
//! ├── domain/          # RetryPolicy, outcomes, handles, errors
//! ├── ports/           # ReconciliationApi, LedgerFinalizer, CoordinatorMetrics
//! ├── finalizers.rs    # per-operation finalizer registry
//! └── service.rs       # SubmissionCoordinator
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod finalizers;
pub mod ports;
pub mod service;

// Re-exports
pub use domain::{
    ConfirmationEvidence, CoordinatorError, DriveResult, FinalizerError, OutcomeFuture,
    OutcomeRegistry, PreparedSubmission, RetryPolicy, StaleSubmission, SubmissionHandle,
    SubmissionOutcome,
};
pub use finalizers::FinalizerRegistry;
pub use ports::{
    CoordinatorMetrics, LedgerFinalizer, NoopMetrics, ReconciliationApi, RecordingFinalizer,
};
pub use service::{SubmissionCoordinator, MAX_RETRIES_EXCEEDED};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
