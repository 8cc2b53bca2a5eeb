//! # Domain Module
//!
//! Business entities, their ledger-facing state, typed contract calls,
//! requests, and errors.

pub mod calls;
pub mod entities;
pub mod errors;
pub mod intents;
pub mod item_status;
pub mod ledger_state;

pub use calls::*;
pub use entities::*;
pub use errors::*;
pub use intents::*;
pub use item_status::*;
pub use ledger_state::*;
