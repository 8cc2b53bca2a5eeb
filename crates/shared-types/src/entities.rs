//! # Core Ledger Entities
//!
//! Vocabulary shared by every subsystem that talks to the supply-chain
//! contract: the named remote operations, their parameter values, the
//! canonical encoding used for fingerprints, the persisted status strings,
//! and the events the ledger emits.
//!
//! ## Clusters
//!
//! - **Operations**: `LedgerOperation`, `ParamValue`, `Parameters`
//! - **Identity**: `RecordId`, `ExternalRef`, `Fingerprint`
//! - **Lifecycle**: `TxStatus`, `LedgerStatus`
//! - **Events**: `EventKind`, `LedgerEvent`, `EventPosition`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ParamError;

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Local identifier of a `TransactionRecord`. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Allocate a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger-assigned transaction identifier (a `0x`-prefixed hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalRef(pub String);

impl ExternalRef {
    /// Create a reference, normalising to lowercase.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_lowercase())
    }

    /// Borrow the raw hash string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex-encoded SHA-256 digest over an operation name and canonical values.
///
/// Used both as the idempotency key of an intent (all parameters) and as
/// the match key the reconciler derives from events (key parameters only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Digest `operation` together with the canonical form of `values`.
    pub fn of(operation: LedgerOperation, values: &[ParamValue]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(operation.name().as_bytes());
        hasher.update(b"(");
        hasher.update(canonical_list(values).as_bytes());
        hasher.update(b")");
        Self(hex::encode(hasher.finalize()))
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLUSTER B: OPERATIONS & PARAMETERS
// =============================================================================

/// Named remote operations exposed by the supply-chain contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LedgerOperation {
    /// Register a new supply chain.
    CreateChain,
    /// Grant a participant a role on a chain.
    AuthorizeParticipant,
    /// Register a new item (batch of material).
    CreateItem,
    /// Move quantity of an item between holders.
    TransferItem,
    /// Consume quantity of a parent item into a child item.
    ProcessItem,
    /// Change the lifecycle status code of an item.
    UpdateItemStatus,
}

impl LedgerOperation {
    /// Every operation, in declaration order.
    pub const ALL: [LedgerOperation; 6] = [
        LedgerOperation::CreateChain,
        LedgerOperation::AuthorizeParticipant,
        LedgerOperation::CreateItem,
        LedgerOperation::TransferItem,
        LedgerOperation::ProcessItem,
        LedgerOperation::UpdateItemStatus,
    ];

    /// Stable name, part of the persisted contract.
    pub const fn name(self) -> &'static str {
        match self {
            LedgerOperation::CreateChain => "CreateChain",
            LedgerOperation::AuthorizeParticipant => "AuthorizeParticipant",
            LedgerOperation::CreateItem => "CreateItem",
            LedgerOperation::TransferItem => "TransferItem",
            LedgerOperation::ProcessItem => "ProcessItem",
            LedgerOperation::UpdateItemStatus => "UpdateItemStatus",
        }
    }
}

impl fmt::Display for LedgerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LedgerOperation {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LedgerOperation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| ParamError::UnknownOperation(s.to_string()))
    }
}

/// A single scalar or array argument of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ParamValue {
    /// Unsigned integer (identifiers, quantities, codes).
    Uint(u64),
    /// Account address, normalised to lowercase.
    Address(String),
    /// Free text.
    Text(String),
    /// Boolean flag.
    Bool(bool),
    /// Homogeneous array.
    Array(Vec<ParamValue>),
}

impl ParamValue {
    /// Build an address value, normalising case.
    pub fn address(value: impl AsRef<str>) -> Self {
        ParamValue::Address(value.as_ref().to_lowercase())
    }

    /// Build a text value.
    pub fn text(value: impl Into<String>) -> Self {
        ParamValue::Text(value.into())
    }

    /// Stable, unambiguous encoding.
    ///
    /// Text is length-prefixed so that delimiters inside user input cannot
    /// collide with the list separators.
    pub fn canonical(&self) -> String {
        match self {
            ParamValue::Uint(v) => format!("u:{v}"),
            ParamValue::Address(a) => format!("a:{a}"),
            ParamValue::Text(t) => format!("t:{}:{t}", t.len()),
            ParamValue::Bool(b) => format!("b:{}", u8::from(*b)),
            ParamValue::Array(items) => format!("[{}]", canonical_list(items)),
        }
    }

    /// Name of the value's type, for diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Uint(_) => "uint",
            ParamValue::Address(_) => "address",
            ParamValue::Text(_) => "text",
            ParamValue::Bool(_) => "bool",
            ParamValue::Array(_) => "array",
        }
    }

    /// Integer view.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            ParamValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Address or text view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Address(s) | ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn canonical_list(values: &[ParamValue]) -> String {
    values
        .iter()
        .map(ParamValue::canonical)
        .collect::<Vec<_>>()
        .join(",")
}

/// Ordered parameter tuple of a remote call. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Parameters(Vec<ParamValue>);

impl Parameters {
    /// Wrap an ordered list of values.
    pub fn new(values: Vec<ParamValue>) -> Self {
        Self(values)
    }

    /// Borrow the values.
    pub fn values(&self) -> &[ParamValue] {
        &self.0
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Option<&ParamValue> {
        self.0.get(index)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical encoding of the whole tuple.
    pub fn canonical(&self) -> String {
        canonical_list(&self.0)
    }
}

impl From<Vec<ParamValue>> for Parameters {
    fn from(values: Vec<ParamValue>) -> Self {
        Self(values)
    }
}

// =============================================================================
// CLUSTER C: LIFECYCLE
// =============================================================================

/// Status of a `TransactionRecord`. The strings are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    /// Created, possibly accepted by the network, not yet executed.
    Pending,
    /// Execution confirmed by a ledger event or receipt.
    Confirmed,
    /// Rejected, retries exhausted, reverted, or abandoned.
    Failed,
    /// Superseded by an identical in-flight submission.
    Redundant,
}

impl TxStatus {
    /// Persisted string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Confirmed => "CONFIRMED",
            TxStatus::Failed => "FAILED",
            TxStatus::Redundant => "REDUNDANT",
        }
    }

    /// Anything but PENDING.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, TxStatus::Pending)
    }

    /// Monotonic lifecycle: only PENDING may move, and only to
    /// CONFIRMED or FAILED. REDUNDANT is assigned at creation.
    pub const fn can_transition_to(self, next: TxStatus) -> bool {
        matches!(
            (self, next),
            (TxStatus::Pending, TxStatus::Confirmed) | (TxStatus::Pending, TxStatus::Failed)
        )
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger-facing status mirrored onto business entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    /// Optimistic local state awaiting the ledger.
    Pending,
    /// Authoritative state confirmed by the ledger.
    Confirmed,
    /// The ledger never applied the mutation.
    Failed,
}

impl LedgerStatus {
    /// Persisted string form.
    pub const fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::Pending => "PENDING",
            LedgerStatus::Confirmed => "CONFIRMED",
            LedgerStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLUSTER D: EVENTS
// =============================================================================

/// Kinds of events emitted by the supply-chain contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// Emitted by `createSupplyChain`.
    SupplyChainCreated,
    /// Emitted by `authorizeParticipant`.
    ParticipantAuthorized,
    /// Emitted by `createItem`.
    ItemCreated,
    /// Emitted by `transferItem`.
    ItemTransferred,
    /// Emitted by `processItem`.
    ItemProcessed,
    /// Emitted by `updateItemStatus`.
    ItemStatusUpdated,
}

impl EventKind {
    /// Every event kind.
    pub const ALL: [EventKind; 6] = [
        EventKind::SupplyChainCreated,
        EventKind::ParticipantAuthorized,
        EventKind::ItemCreated,
        EventKind::ItemTransferred,
        EventKind::ItemProcessed,
        EventKind::ItemStatusUpdated,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Position of an event in the ledger's total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EventPosition {
    /// Block containing the event.
    pub block_number: u64,
    /// Index of the log within the block.
    pub log_index: u32,
}

/// An event emitted by the contract, as delivered by a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Address of the emitting contract.
    pub contract: String,
    /// Named payload fields.
    pub fields: BTreeMap<String, ParamValue>,
    /// Hash of the transaction that emitted the event.
    pub transaction_hash: ExternalRef,
    /// Block containing the transaction.
    pub block_number: u64,
    /// Index of the log within the block.
    pub log_index: u32,
}

impl LedgerEvent {
    /// Position in the ledger's total order.
    pub fn position(&self) -> EventPosition {
        EventPosition {
            block_number: self.block_number,
            log_index: self.log_index,
        }
    }

    /// Raw field lookup.
    pub fn field(&self, name: &str) -> Option<&ParamValue> {
        self.fields.get(name)
    }

    /// Integer field, or a `MissingField` error.
    pub fn uint(&self, name: &str) -> Result<u64, ParamError> {
        self.field(name)
            .and_then(ParamValue::as_uint)
            .ok_or_else(|| self.missing(name))
    }

    /// Address or text field, or a `MissingField` error.
    pub fn string(&self, name: &str) -> Result<&str, ParamError> {
        self.field(name)
            .and_then(ParamValue::as_str)
            .ok_or_else(|| self.missing(name))
    }

    fn missing(&self, name: &str) -> ParamError {
        ParamError::MissingField {
            kind: self.kind.to_string(),
            field: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_text_is_length_prefixed() {
        let a = Parameters::new(vec![ParamValue::text("a,t:1:b")]);
        let b = Parameters::new(vec![ParamValue::text("a"), ParamValue::text("b")]);
        assert_ne!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), "t:7:a,t:1:b");
    }

    #[test]
    fn test_canonical_nested_array() {
        let params = Parameters::new(vec![
            ParamValue::Uint(7),
            ParamValue::Array(vec![ParamValue::Uint(1), ParamValue::Uint(2)]),
            ParamValue::Bool(true),
        ]);
        assert_eq!(params.canonical(), "u:7,[u:1,u:2],b:1");
    }

    #[test]
    fn test_fingerprint_depends_on_operation() {
        let values = vec![ParamValue::Uint(42)];
        let create = Fingerprint::of(LedgerOperation::CreateItem, &values);
        let status = Fingerprint::of(LedgerOperation::UpdateItemStatus, &values);
        assert_ne!(create, status);
        assert_eq!(create, Fingerprint::of(LedgerOperation::CreateItem, &values));
        assert_eq!(create.0.len(), 64);
    }

    #[test]
    fn test_address_normalised() {
        assert_eq!(ParamValue::address("0xABCD"), ParamValue::address("0xabcd"));
        assert_eq!(ExternalRef::new("0xABC").as_str(), "0xabc");
    }

    #[test]
    fn test_status_strings_are_stable() {
        assert_eq!(serde_json::to_string(&TxStatus::Redundant).unwrap(), "\"REDUNDANT\"");
        assert_eq!(serde_json::to_string(&LedgerStatus::Pending).unwrap(), "\"PENDING\"");
        assert_eq!(TxStatus::Confirmed.as_str(), "CONFIRMED");
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        assert!(TxStatus::Pending.can_transition_to(TxStatus::Confirmed));
        assert!(TxStatus::Pending.can_transition_to(TxStatus::Failed));
        assert!(!TxStatus::Pending.can_transition_to(TxStatus::Redundant));
        for terminal in [TxStatus::Confirmed, TxStatus::Failed, TxStatus::Redundant] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(TxStatus::Pending));
            assert!(!terminal.can_transition_to(TxStatus::Confirmed));
        }
    }

    #[test]
    fn test_operation_round_trips_through_name() {
        for op in LedgerOperation::ALL {
            assert_eq!(op.name().parse::<LedgerOperation>().unwrap(), op);
        }
        assert!("DeleteItem".parse::<LedgerOperation>().is_err());
    }

    #[test]
    fn test_event_field_accessors() {
        let mut fields = BTreeMap::new();
        fields.insert("itemId".to_string(), ParamValue::Uint(42));
        let event = LedgerEvent {
            kind: EventKind::ItemCreated,
            contract: "0xc0ffee".to_string(),
            fields,
            transaction_hash: ExternalRef::new("0xabc"),
            block_number: 3,
            log_index: 1,
        };
        assert_eq!(event.uint("itemId").unwrap(), 42);
        assert!(matches!(
            event.uint("quantity"),
            Err(ParamError::MissingField { .. })
        ));
        assert!(event.position() > EventPosition { block_number: 3, log_index: 0 });
    }
}
