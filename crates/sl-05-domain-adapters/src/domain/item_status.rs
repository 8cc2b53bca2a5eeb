//! Item lifecycle status codes as stored on the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code of an item.
///
/// Codes outside the known set are carried through unchanged; their meaning
/// is not decided here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    /// 0
    Created,
    /// 1
    InTransit,
    /// 2
    Delivered,
    /// 3
    Processed,
    /// Any other code.
    Unclassified(u64),
}

impl ItemStatus {
    /// Status for a ledger code.
    pub const fn from_code(code: u64) -> Self {
        match code {
            0 => ItemStatus::Created,
            1 => ItemStatus::InTransit,
            2 => ItemStatus::Delivered,
            3 => ItemStatus::Processed,
            other => ItemStatus::Unclassified(other),
        }
    }

    /// Ledger code.
    pub const fn code(self) -> u64 {
        match self {
            ItemStatus::Created => 0,
            ItemStatus::InTransit => 1,
            ItemStatus::Delivered => 2,
            ItemStatus::Processed => 3,
            ItemStatus::Unclassified(code) => code,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Unclassified(code) => write!(f, "UNCLASSIFIED({code})"),
            ItemStatus::Created => f.write_str("CREATED"),
            ItemStatus::InTransit => f.write_str("IN_TRANSIT"),
            ItemStatus::Delivered => f.write_str("DELIVERED"),
            ItemStatus::Processed => f.write_str("PROCESSED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        for code in 0..6 {
            assert_eq!(ItemStatus::from_code(code).code(), code);
        }
        assert_eq!(ItemStatus::from_code(1), ItemStatus::InTransit);
        assert_eq!(ItemStatus::from_code(4), ItemStatus::Unclassified(4));
        assert_eq!(ItemStatus::Unclassified(4).to_string(), "UNCLASSIFIED(4)");
    }
}
