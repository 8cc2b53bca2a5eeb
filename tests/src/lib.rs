//! # Supply-Ledger Test Suite
//!
//! Flows that cross subsystem boundaries: a domain intent goes through the
//! coordinator to the simulated ledger, and the resulting events come back
//! through the reconciler.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs        # LedgerNetwork: every subsystem wired in-process
//!     ├── submission.rs      # Idempotency, retry bound, validation, monotonic status
//!     └── reconciliation.rs  # Replay, ordering, checkpoint resume, receipt recovery
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sl-tests
//!
//! # By category
//! cargo test -p sl-tests integration::submission::
//! cargo test -p sl-tests integration::reconciliation::
//! ```

pub mod integration;
