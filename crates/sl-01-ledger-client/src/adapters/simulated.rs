//! Simulated Ledger Adapter
//!
//! In-process ledger implementing the `LedgerClient` port. Calls are
//! validated against the contract binding, accepted into a pending pool
//! with a deterministic hash, and executed when a block is mined. Executed
//! calls publish their event on the shared bus and leave a receipt.
//!
//! Fault injection covers the failure modes the coordinator must handle:
//! transport failures, synchronous rejections, and reverts at execution.

use crate::domain::{
    ContractBinding, LedgerClientError, MinedBlock, Receipt, ReceiptStatus, SubmissionError,
    TransportKind,
};
use crate::ports::outbound::{LedgerClient, LedgerEventStream};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus};
use shared_types::{EventPosition, ExternalRef, LedgerEvent, LedgerOperation, Parameters};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// A call accepted into the pending pool.
#[derive(Debug, Clone)]
struct PendingCall {
    hash: ExternalRef,
    operation: LedgerOperation,
    parameters: Parameters,
}

#[derive(Debug, Default)]
struct LedgerState {
    nonce: u64,
    block_number: u64,
    pending: Vec<PendingCall>,
    receipts: HashMap<ExternalRef, Receipt>,
    log: Vec<LedgerEvent>,
}

#[derive(Debug, Default)]
struct FaultPlan {
    transport: VecDeque<TransportKind>,
    rejections: VecDeque<String>,
    reverts: VecDeque<String>,
}

/// In-process ledger.
pub struct SimulatedLedger {
    binding: Arc<dyn ContractBinding>,
    bus: Arc<InMemoryEventBus>,
    state: RwLock<LedgerState>,
    faults: Mutex<FaultPlan>,
}

impl SimulatedLedger {
    /// Create a ledger publishing on `bus`.
    pub fn new(binding: Arc<dyn ContractBinding>, bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            binding,
            bus,
            state: RwLock::new(LedgerState::default()),
            faults: Mutex::new(FaultPlan::default()),
        }
    }

    /// Fail the next `count` submissions with a transport error of `kind`.
    pub fn fail_next(&self, count: usize, kind: TransportKind) {
        let mut faults = self.faults.lock();
        faults.transport.extend(std::iter::repeat(kind).take(count));
    }

    /// Reject the next submission with `reason`.
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.faults.lock().rejections.push_back(reason.into());
    }

    /// Revert the next executed call with `reason`.
    pub fn revert_next(&self, reason: impl Into<String>) {
        self.faults.lock().reverts.push_back(reason.into());
    }

    /// Number of calls awaiting a block.
    pub fn pending_count(&self) -> usize {
        self.state.read().pending.len()
    }

    /// Every event emitted so far, in ledger order.
    pub fn event_log(&self) -> Vec<LedgerEvent> {
        self.state.read().log.clone()
    }

    /// Execute every pending call in a new block and publish the events.
    pub async fn mine_block(&self) -> MinedBlock {
        let block = {
            let mut state = self.state.write();
            state.block_number += 1;
            let number = state.block_number;
            let calls = std::mem::take(&mut state.pending);

            let mut block = MinedBlock {
                number,
                ..MinedBlock::default()
            };
            let mut log_index = 0u32;

            for call in calls {
                let revert = self.faults.lock().reverts.pop_front();
                let receipt = match revert {
                    Some(reason) => {
                        debug!(tx_hash = %call.hash, reason = %reason, "[sl-01] Call reverted");
                        Receipt {
                            transaction_hash: call.hash.clone(),
                            block_number: number,
                            status: ReceiptStatus::Reverted,
                            events: vec![],
                            revert_reason: Some(reason),
                        }
                    }
                    None => {
                        let event = LedgerEvent {
                            kind: self.binding.event_kind(call.operation),
                            contract: self.binding.address().to_string(),
                            fields: self.binding.event_fields(call.operation, &call.parameters),
                            transaction_hash: call.hash.clone(),
                            block_number: number,
                            log_index,
                        };
                        log_index += 1;
                        state.log.push(event.clone());
                        block.events.push(event.clone());
                        Receipt {
                            transaction_hash: call.hash.clone(),
                            block_number: number,
                            status: ReceiptStatus::Success,
                            events: vec![event],
                            revert_reason: None,
                        }
                    }
                };
                state.receipts.insert(call.hash.clone(), receipt);
                block.transactions.push(call.hash);
            }
            block
        };

        for event in &block.events {
            self.bus.publish(event.clone()).await;
        }

        info!(
            block = block.number,
            transactions = block.transactions.len(),
            events = block.events.len(),
            "[sl-01] Block mined"
        );
        block
    }

    /// Publish an already emitted event again, as a reconnecting node would.
    pub async fn redeliver(&self, event: LedgerEvent) -> usize {
        self.bus.publish(event).await
    }

    fn transaction_hash(nonce: u64, function: &str, parameters: &Parameters) -> ExternalRef {
        let mut hasher = Sha256::new();
        hasher.update(nonce.to_be_bytes());
        hasher.update(function.as_bytes());
        hasher.update(parameters.canonical().as_bytes());
        ExternalRef::new(format!("0x{}", hex::encode(hasher.finalize())))
    }
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    async fn submit(
        &self,
        operation: LedgerOperation,
        parameters: &Parameters,
    ) -> Result<ExternalRef, SubmissionError> {
        {
            let mut faults = self.faults.lock();
            if let Some(kind) = faults.transport.pop_front() {
                warn!(operation = %operation, kind = %kind, "[sl-01] Injected transport failure");
                return Err(SubmissionError::transport(kind, "injected fault"));
            }
            if let Some(reason) = faults.rejections.pop_front() {
                warn!(operation = %operation, reason = %reason, "[sl-01] Injected rejection");
                return Err(SubmissionError::rejected(reason));
            }
        }

        self.binding.validate(operation, parameters)?;

        let mut state = self.state.write();
        state.nonce += 1;
        let hash = Self::transaction_hash(
            state.nonce,
            self.binding.function_name(operation),
            parameters,
        );
        state.pending.push(PendingCall {
            hash: hash.clone(),
            operation,
            parameters: parameters.clone(),
        });

        debug!(
            operation = %operation,
            function = self.binding.function_name(operation),
            tx_hash = %hash,
            "[sl-01] Call accepted into pending pool"
        );
        Ok(hash)
    }

    async fn subscribe(&self, filter: EventFilter) -> Result<LedgerEventStream, LedgerClientError> {
        // Subscribe before reading history so nothing falls between the two.
        let live = self.bus.event_stream(filter.clone());

        let history: Vec<LedgerEvent> = match filter.from_block {
            Some(_) => self
                .state
                .read()
                .log
                .iter()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        let replayed_up_to: Option<EventPosition> = history.last().map(LedgerEvent::position);

        debug!(
            from_block = ?filter.from_block,
            replayed = history.len(),
            "[sl-01] Subscription opened"
        );

        let live = live.filter(move |e| replayed_up_to.map_or(true, |p| e.position() > p));
        Ok(Box::pin(tokio_stream::iter(history).chain(live)))
    }

    async fn receipt(&self, reference: &ExternalRef) -> Result<Option<Receipt>, LedgerClientError> {
        Ok(self.state.read().receipts.get(reference).cloned())
    }

    async fn latest_block(&self) -> Result<u64, LedgerClientError> {
        Ok(self.state.read().block_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SupplyChainContract;
    use shared_types::{EventKind, ParamValue};
    use std::time::Duration;
    use tokio::time::timeout;

    fn ledger() -> SimulatedLedger {
        SimulatedLedger::new(
            Arc::new(SupplyChainContract::new("0xc0ffee")),
            Arc::new(InMemoryEventBus::new()),
        )
    }

    fn create_item(id: u64) -> Parameters {
        Parameters::new(vec![
            ParamValue::Uint(id),
            ParamValue::Uint(7),
            ParamValue::Uint(100),
            ParamValue::text("raw-material"),
            ParamValue::address("0xa11ce"),
        ])
    }

    async fn next(stream: &mut LedgerEventStream) -> LedgerEvent {
        timeout(Duration::from_millis(200), stream.next())
            .await
            .expect("timeout")
            .expect("event")
    }

    #[tokio::test]
    async fn test_submit_then_mine_emits_event_and_receipt() {
        let ledger = ledger();
        let mut stream = ledger.subscribe(EventFilter::all()).await.unwrap();

        let hash = ledger
            .submit(LedgerOperation::CreateItem, &create_item(42))
            .await
            .unwrap();
        assert_eq!(ledger.pending_count(), 1);
        assert!(ledger.receipt(&hash).await.unwrap().is_none());

        let block = ledger.mine_block().await;
        assert_eq!(block.number, 1);
        assert_eq!(block.transactions, vec![hash.clone()]);

        let event = next(&mut stream).await;
        assert_eq!(event.kind, EventKind::ItemCreated);
        assert_eq!(event.transaction_hash, hash);
        assert_eq!(event.uint("itemId").unwrap(), 42);
        assert_eq!(event.string("itemType").unwrap(), "raw-material");

        let receipt = ledger.receipt(&hash).await.unwrap().unwrap();
        assert!(receipt.is_success());
        assert_eq!(ledger.latest_block().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_parameters_rejected() {
        let ledger = ledger();
        let err = ledger
            .submit(LedgerOperation::CreateItem, &Parameters::new(vec![ParamValue::Uint(1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Rejected { .. }));
        assert_eq!(ledger.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let ledger = ledger();
        ledger.fail_next(2, TransportKind::Timeout);
        ledger.reject_next("insufficient funds");

        for _ in 0..2 {
            let err = ledger
                .submit(LedgerOperation::CreateItem, &create_item(1))
                .await
                .unwrap_err();
            assert!(err.is_retryable());
        }
        let err = ledger
            .submit(LedgerOperation::CreateItem, &create_item(1))
            .await
            .unwrap_err();
        assert_eq!(err, SubmissionError::rejected("insufficient funds"));

        assert!(ledger
            .submit(LedgerOperation::CreateItem, &create_item(1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_revert_leaves_receipt_without_event() {
        let ledger = ledger();
        ledger.revert_next("item exists");

        let hash = ledger
            .submit(LedgerOperation::CreateItem, &create_item(1))
            .await
            .unwrap();
        let block = ledger.mine_block().await;

        assert!(block.events.is_empty());
        let receipt = ledger.receipt(&hash).await.unwrap().unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Reverted);
        assert_eq!(receipt.revert_reason.as_deref(), Some("item exists"));
    }

    #[tokio::test]
    async fn test_hashes_are_unique_per_submission() {
        let ledger = ledger();
        let a = ledger
            .submit(LedgerOperation::CreateItem, &create_item(1))
            .await
            .unwrap();
        let b = ledger
            .submit(LedgerOperation::CreateItem, &create_item(1))
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_subscribe_from_block_replays_history_then_live() {
        let ledger = ledger();
        ledger
            .submit(LedgerOperation::CreateItem, &create_item(1))
            .await
            .unwrap();
        ledger.mine_block().await;
        ledger
            .submit(LedgerOperation::CreateItem, &create_item(2))
            .await
            .unwrap();
        ledger.mine_block().await;

        let mut stream = ledger
            .subscribe(EventFilter::contract("0xc0ffee").from_block(2))
            .await
            .unwrap();

        ledger
            .submit(LedgerOperation::CreateItem, &create_item(3))
            .await
            .unwrap();
        ledger.mine_block().await;

        assert_eq!(next(&mut stream).await.uint("itemId").unwrap(), 2);
        assert_eq!(next(&mut stream).await.uint("itemId").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_subscribe_latest_skips_history() {
        let ledger = ledger();
        ledger
            .submit(LedgerOperation::CreateItem, &create_item(1))
            .await
            .unwrap();
        ledger.mine_block().await;

        let mut stream = ledger.subscribe(EventFilter::all()).await.unwrap();
        ledger
            .submit(LedgerOperation::CreateItem, &create_item(2))
            .await
            .unwrap();
        ledger.mine_block().await;

        assert_eq!(next(&mut stream).await.uint("itemId").unwrap(), 2);
        assert_eq!(ledger.event_log().len(), 2);
    }
}
