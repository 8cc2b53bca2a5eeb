//! # Ledger Calls
//!
//! Typed view of the six contract calls. Adapters build parameters from
//! it; finalizers read it back from a stored record or from the event the
//! ledger emitted, which is authoritative when present.

use super::item_status::ItemStatus;
use shared_types::{EventKind, LedgerEvent, LedgerOperation, ParamError, ParamValue, Parameters};

/// One contract call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// `createSupplyChain`
    CreateChain {
        /// Chain id.
        chain_id: u64,
        /// Display name.
        name: String,
        /// Owner address.
        owner: String,
    },
    /// `authorizeParticipant`
    Authorize {
        /// Chain id.
        chain_id: u64,
        /// Participant address.
        participant: String,
        /// Granted role.
        role: String,
    },
    /// `createItem`
    CreateItem {
        /// Item id.
        item_id: u64,
        /// Owning chain.
        supply_chain_id: u64,
        /// Quantity created.
        quantity: u64,
        /// Type label.
        item_type: String,
        /// Creator.
        owner: String,
    },
    /// `transferItem`
    Transfer {
        /// Item id.
        item_id: u64,
        /// Sender.
        from: String,
        /// Receiver.
        to: String,
        /// Quantity moved.
        quantity: u64,
    },
    /// `processItem`
    Process {
        /// Material consumed.
        parent_item_id: u64,
        /// Item produced.
        child_item_id: u64,
        /// Quantity consumed.
        quantity: u64,
    },
    /// `updateItemStatus`
    UpdateStatus {
        /// Item id.
        item_id: u64,
        /// New status.
        status: ItemStatus,
    },
}

impl LedgerCall {
    /// Operation this call performs.
    pub fn operation(&self) -> LedgerOperation {
        match self {
            LedgerCall::CreateChain { .. } => LedgerOperation::CreateChain,
            LedgerCall::Authorize { .. } => LedgerOperation::AuthorizeParticipant,
            LedgerCall::CreateItem { .. } => LedgerOperation::CreateItem,
            LedgerCall::Transfer { .. } => LedgerOperation::TransferItem,
            LedgerCall::Process { .. } => LedgerOperation::ProcessItem,
            LedgerCall::UpdateStatus { .. } => LedgerOperation::UpdateItemStatus,
        }
    }

    /// Positional call parameters, in contract order.
    pub fn to_parameters(&self) -> Parameters {
        let values = match self {
            LedgerCall::CreateChain {
                chain_id,
                name,
                owner,
            } => vec![
                ParamValue::Uint(*chain_id),
                ParamValue::text(name.as_str()),
                ParamValue::address(owner),
            ],
            LedgerCall::Authorize {
                chain_id,
                participant,
                role,
            } => vec![
                ParamValue::Uint(*chain_id),
                ParamValue::address(participant),
                ParamValue::text(role.as_str()),
            ],
            LedgerCall::CreateItem {
                item_id,
                supply_chain_id,
                quantity,
                item_type,
                owner,
            } => vec![
                ParamValue::Uint(*item_id),
                ParamValue::Uint(*supply_chain_id),
                ParamValue::Uint(*quantity),
                ParamValue::text(item_type.as_str()),
                ParamValue::address(owner),
            ],
            LedgerCall::Transfer {
                item_id,
                from,
                to,
                quantity,
            } => vec![
                ParamValue::Uint(*item_id),
                ParamValue::address(from),
                ParamValue::address(to),
                ParamValue::Uint(*quantity),
            ],
            LedgerCall::Process {
                parent_item_id,
                child_item_id,
                quantity,
            } => vec![
                ParamValue::Uint(*parent_item_id),
                ParamValue::Uint(*child_item_id),
                ParamValue::Uint(*quantity),
            ],
            LedgerCall::UpdateStatus { item_id, status } => vec![
                ParamValue::Uint(*item_id),
                ParamValue::Uint(status.code()),
            ],
        };
        Parameters::new(values)
    }

    /// Read a call back from stored parameters.
    pub fn from_parameters(
        operation: LedgerOperation,
        parameters: &Parameters,
    ) -> Result<Self, ParamError> {
        let p = Positional {
            operation,
            parameters,
        };
        Ok(match operation {
            LedgerOperation::CreateChain => LedgerCall::CreateChain {
                chain_id: p.uint(0, "chainId")?,
                name: p.string(1, "name")?,
                owner: p.string(2, "owner")?,
            },
            LedgerOperation::AuthorizeParticipant => LedgerCall::Authorize {
                chain_id: p.uint(0, "chainId")?,
                participant: p.string(1, "participant")?,
                role: p.string(2, "role")?,
            },
            LedgerOperation::CreateItem => LedgerCall::CreateItem {
                item_id: p.uint(0, "itemId")?,
                supply_chain_id: p.uint(1, "supplyChainId")?,
                quantity: p.uint(2, "quantity")?,
                item_type: p.string(3, "itemType")?,
                owner: p.string(4, "owner")?,
            },
            LedgerOperation::TransferItem => LedgerCall::Transfer {
                item_id: p.uint(0, "itemId")?,
                from: p.string(1, "from")?,
                to: p.string(2, "to")?,
                quantity: p.uint(3, "quantity")?,
            },
            LedgerOperation::ProcessItem => LedgerCall::Process {
                parent_item_id: p.uint(0, "parentItemId")?,
                child_item_id: p.uint(1, "childItemId")?,
                quantity: p.uint(2, "quantity")?,
            },
            LedgerOperation::UpdateItemStatus => LedgerCall::UpdateStatus {
                item_id: p.uint(0, "itemId")?,
                status: ItemStatus::from_code(p.uint(1, "status")?),
            },
        })
    }

    /// Read a call from the event the ledger emitted for it.
    pub fn from_event(event: &LedgerEvent) -> Result<Self, ParamError> {
        let address = |name: &str| event.string(name).map(str::to_lowercase);
        Ok(match event.kind {
            EventKind::SupplyChainCreated => LedgerCall::CreateChain {
                chain_id: event.uint("chainId")?,
                name: event.string("name")?.to_string(),
                owner: address("owner")?,
            },
            EventKind::ParticipantAuthorized => LedgerCall::Authorize {
                chain_id: event.uint("chainId")?,
                participant: address("participant")?,
                role: event.string("role")?.to_string(),
            },
            EventKind::ItemCreated => LedgerCall::CreateItem {
                item_id: event.uint("itemId")?,
                supply_chain_id: event.uint("supplyChainId")?,
                quantity: event.uint("quantity")?,
                item_type: event.string("itemType")?.to_string(),
                owner: address("owner")?,
            },
            EventKind::ItemTransferred => LedgerCall::Transfer {
                item_id: event.uint("itemId")?,
                from: address("from")?,
                to: address("to")?,
                quantity: event.uint("quantity")?,
            },
            EventKind::ItemProcessed => LedgerCall::Process {
                parent_item_id: event.uint("parentItemId")?,
                child_item_id: event.uint("childItemId")?,
                quantity: event.uint("quantity")?,
            },
            EventKind::ItemStatusUpdated => LedgerCall::UpdateStatus {
                item_id: event.uint("itemId")?,
                status: ItemStatus::from_code(event.uint("status")?),
            },
        })
    }
}

struct Positional<'a> {
    operation: LedgerOperation,
    parameters: &'a Parameters,
}

impl Positional<'_> {
    fn value(&self, index: usize) -> Result<&ParamValue, ParamError> {
        self.parameters
            .get(index)
            .ok_or_else(|| ParamError::ArityMismatch {
                operation: self.operation.name().to_string(),
                expected: index + 1,
                got: self.parameters.len(),
            })
    }

    fn mismatch(&self, param: &str, expected: &str, got: &ParamValue) -> ParamError {
        ParamError::TypeMismatch {
            operation: self.operation.name().to_string(),
            param: param.to_string(),
            expected: expected.to_string(),
            got: got.type_name().to_string(),
        }
    }

    fn uint(&self, index: usize, name: &str) -> Result<u64, ParamError> {
        let value = self.value(index)?;
        value.as_uint().ok_or_else(|| self.mismatch(name, "uint", value))
    }

    fn string(&self, index: usize, name: &str) -> Result<String, ParamError> {
        let value = self.value(index)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.mismatch(name, "address or text", value))
    }
}
