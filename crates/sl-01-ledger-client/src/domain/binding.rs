//! # Contract Binding
//!
//! Static mapping between local operations and the remote contract:
//! function names, parameter schemas, emitted event kinds, and the key
//! fields an event echoes back for matching.
//!
//! ```text
//! LedgerOperation ──function_name()──→ "createItem"
//!        │
//!        ├──schema()──→ [itemId: uint (key), supplyChainId: uint, ...]
//!        │
//!        └──event_kind()──→ ItemCreated ──operation_for()──→ LedgerOperation
//! ```

use shared_types::{
    EventKind, Fingerprint, LedgerEvent, LedgerOperation, ParamError, ParamValue, Parameters,
};
use std::collections::BTreeMap;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Unsigned integer.
    Uint,
    /// Account address.
    Address,
    /// Free text.
    Text,
    /// Boolean flag.
    Bool,
    /// Array of values.
    Array,
}

impl ParamType {
    /// Name used in diagnostics; matches `ParamValue::type_name`.
    pub const fn name(self) -> &'static str {
        match self {
            ParamType::Uint => "uint",
            ParamType::Address => "address",
            ParamType::Text => "text",
            ParamType::Bool => "bool",
            ParamType::Array => "array",
        }
    }

    fn accepts(self, value: &ParamValue) -> bool {
        matches!(
            (self, value),
            (ParamType::Uint, ParamValue::Uint(_))
                | (ParamType::Address, ParamValue::Address(_))
                | (ParamType::Text, ParamValue::Text(_))
                | (ParamType::Bool, ParamValue::Bool(_))
                | (ParamType::Array, ParamValue::Array(_))
        )
    }
}

/// One parameter of a remote function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Field name, shared by the call and the emitted event.
    pub name: &'static str,
    /// Declared type.
    pub kind: ParamType,
    /// Whether the event echoes this field for matching.
    pub key: bool,
}

const fn key(name: &'static str, kind: ParamType) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        key: true,
    }
}

const fn field(name: &'static str, kind: ParamType) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        key: false,
    }
}

/// Maps operations to remote calls and events back to operations.
///
/// Implementors supply the static tables; validation, match keys and event
/// payloads are derived from them.
pub trait ContractBinding: Send + Sync {
    /// Address of the deployed contract (lowercase).
    fn address(&self) -> &str;

    /// Remote function invoked for `operation`.
    fn function_name(&self, operation: LedgerOperation) -> &'static str;

    /// Ordered parameter schema of `operation`.
    fn schema(&self, operation: LedgerOperation) -> &'static [ParamSpec];

    /// Event kind emitted when `operation` executes.
    fn event_kind(&self, operation: LedgerOperation) -> EventKind;

    /// Operation that emits `kind`.
    fn operation_for(&self, kind: EventKind) -> LedgerOperation;

    /// Check arity and types of `parameters` against the schema.
    fn validate(&self, operation: LedgerOperation, parameters: &Parameters) -> Result<(), ParamError> {
        let schema = self.schema(operation);
        if schema.len() != parameters.len() {
            return Err(ParamError::ArityMismatch {
                operation: operation.name().to_string(),
                expected: schema.len(),
                got: parameters.len(),
            });
        }
        for (spec, value) in schema.iter().zip(parameters.values()) {
            if !spec.kind.accepts(value) {
                return Err(ParamError::TypeMismatch {
                    operation: operation.name().to_string(),
                    param: spec.name.to_string(),
                    expected: spec.kind.name().to_string(),
                    got: value.type_name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Match key of an outgoing call: fingerprint over its key parameters.
    fn match_key(&self, operation: LedgerOperation, parameters: &Parameters) -> Fingerprint {
        let values: Vec<ParamValue> = self
            .schema(operation)
            .iter()
            .zip(parameters.values())
            .filter(|(spec, _)| spec.key)
            .map(|(_, value)| value.clone())
            .collect();
        Fingerprint::of(operation, &values)
    }

    /// Operation and match key derived from an incoming event.
    fn event_match_key(&self, event: &LedgerEvent) -> Result<(LedgerOperation, Fingerprint), ParamError> {
        let operation = self.operation_for(event.kind);
        let mut values = Vec::new();
        for spec in self.schema(operation).iter().filter(|s| s.key) {
            let value = event.field(spec.name).ok_or_else(|| ParamError::MissingField {
                kind: event.kind.to_string(),
                field: spec.name.to_string(),
            })?;
            values.push(value.clone());
        }
        Ok((operation, Fingerprint::of(operation, &values)))
    }

    /// Named payload of the event `operation` emits for `parameters`.
    fn event_fields(
        &self,
        operation: LedgerOperation,
        parameters: &Parameters,
    ) -> BTreeMap<String, ParamValue> {
        self.schema(operation)
            .iter()
            .zip(parameters.values())
            .map(|(spec, value)| (spec.name.to_string(), value.clone()))
            .collect()
    }
}

const CREATE_CHAIN: &[ParamSpec] = &[
    key("chainId", ParamType::Uint),
    field("name", ParamType::Text),
    field("owner", ParamType::Address),
];

const AUTHORIZE_PARTICIPANT: &[ParamSpec] = &[
    key("chainId", ParamType::Uint),
    key("participant", ParamType::Address),
    field("role", ParamType::Text),
];

const CREATE_ITEM: &[ParamSpec] = &[
    key("itemId", ParamType::Uint),
    field("supplyChainId", ParamType::Uint),
    field("quantity", ParamType::Uint),
    field("itemType", ParamType::Text),
    field("owner", ParamType::Address),
];

const TRANSFER_ITEM: &[ParamSpec] = &[
    key("itemId", ParamType::Uint),
    key("from", ParamType::Address),
    key("to", ParamType::Address),
    key("quantity", ParamType::Uint),
];

const PROCESS_ITEM: &[ParamSpec] = &[
    key("parentItemId", ParamType::Uint),
    key("childItemId", ParamType::Uint),
    field("quantity", ParamType::Uint),
];

const UPDATE_ITEM_STATUS: &[ParamSpec] = &[
    key("itemId", ParamType::Uint),
    key("status", ParamType::Uint),
];

/// Binding for the deployed supply-chain contract.
#[derive(Debug, Clone)]
pub struct SupplyChainContract {
    address: String,
}

impl SupplyChainContract {
    /// Bind to the contract deployed at `address`.
    pub fn new(address: impl AsRef<str>) -> Self {
        Self {
            address: address.as_ref().to_lowercase(),
        }
    }
}

impl ContractBinding for SupplyChainContract {
    fn address(&self) -> &str {
        &self.address
    }

    fn function_name(&self, operation: LedgerOperation) -> &'static str {
        match operation {
            LedgerOperation::CreateChain => "createSupplyChain",
            LedgerOperation::AuthorizeParticipant => "authorizeParticipant",
            LedgerOperation::CreateItem => "createItem",
            LedgerOperation::TransferItem => "transferItem",
            LedgerOperation::ProcessItem => "processItem",
            LedgerOperation::UpdateItemStatus => "updateItemStatus",
        }
    }

    fn schema(&self, operation: LedgerOperation) -> &'static [ParamSpec] {
        match operation {
            LedgerOperation::CreateChain => CREATE_CHAIN,
            LedgerOperation::AuthorizeParticipant => AUTHORIZE_PARTICIPANT,
            LedgerOperation::CreateItem => CREATE_ITEM,
            LedgerOperation::TransferItem => TRANSFER_ITEM,
            LedgerOperation::ProcessItem => PROCESS_ITEM,
            LedgerOperation::UpdateItemStatus => UPDATE_ITEM_STATUS,
        }
    }

    fn event_kind(&self, operation: LedgerOperation) -> EventKind {
        match operation {
            LedgerOperation::CreateChain => EventKind::SupplyChainCreated,
            LedgerOperation::AuthorizeParticipant => EventKind::ParticipantAuthorized,
            LedgerOperation::CreateItem => EventKind::ItemCreated,
            LedgerOperation::TransferItem => EventKind::ItemTransferred,
            LedgerOperation::ProcessItem => EventKind::ItemProcessed,
            LedgerOperation::UpdateItemStatus => EventKind::ItemStatusUpdated,
        }
    }

    fn operation_for(&self, kind: EventKind) -> LedgerOperation {
        match kind {
            EventKind::SupplyChainCreated => LedgerOperation::CreateChain,
            EventKind::ParticipantAuthorized => LedgerOperation::AuthorizeParticipant,
            EventKind::ItemCreated => LedgerOperation::CreateItem,
            EventKind::ItemTransferred => LedgerOperation::TransferItem,
            EventKind::ItemProcessed => LedgerOperation::ProcessItem,
            EventKind::ItemStatusUpdated => LedgerOperation::UpdateItemStatus,
        }
    }
}
