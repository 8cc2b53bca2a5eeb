//! # Shared Bus - Ledger Event Bus
//!
//! In-process transport for events emitted by the supply-chain contract.
//! The ledger side publishes; the reconciler (and anything else that cares)
//! subscribes with a filter.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Ledger     │                    │  Reconciler  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe(filter)
//! ```
//!
//! ## Delivery
//!
//! - Events are delivered to each subscriber in publish order
//! - Slow subscribers that fall behind the channel capacity lose the oldest
//!   events; the gap is logged (replay from a checkpoint covers it)
//! - Events that fail downstream are parked in the [`DeadLetterQueue`]

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dead_letter;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use events::EventFilter;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
