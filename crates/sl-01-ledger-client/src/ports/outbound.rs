//! # Outbound Ports
//!
//! The external ledger as seen by the submission coordinator and the event
//! reconciler.

use crate::domain::{LedgerClientError, Receipt, SubmissionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{EventFilter, EventPublisher, InMemoryEventBus};
use shared_types::{ExternalRef, LedgerEvent, LedgerOperation, Parameters};
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_stream::Stream;

/// Unbounded stream of ledger events, in ledger order.
pub type LedgerEventStream = Pin<Box<dyn Stream<Item = LedgerEvent> + Send>>;

/// External ledger client - outbound port.
///
/// `submit` returning `Ok` means the call was accepted into the pending
/// pool, not that it executed. Execution is observed through events or
/// receipts.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit `operation` with `parameters`; returns the transaction hash.
    async fn submit(
        &self,
        operation: LedgerOperation,
        parameters: &Parameters,
    ) -> Result<ExternalRef, SubmissionError>;

    /// Stream events matching `filter`, starting at `filter.from_block`
    /// (inclusive) or at the latest block when unset.
    async fn subscribe(&self, filter: EventFilter) -> Result<LedgerEventStream, LedgerClientError>;

    /// Receipt of a mined transaction, `None` while still pending or unknown.
    async fn receipt(&self, reference: &ExternalRef) -> Result<Option<Receipt>, LedgerClientError>;

    /// Number of the latest mined block.
    async fn latest_block(&self) -> Result<u64, LedgerClientError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Scripted ledger client for testing.
///
/// Each `submit` pops the next scripted result; with an empty script it
/// returns `always` if set, else accepts with a generated hash.
#[derive(Default)]
pub struct MockLedgerClient {
    script: Mutex<VecDeque<Result<ExternalRef, SubmissionError>>>,
    always: Mutex<Option<SubmissionError>>,
    calls: Mutex<Vec<(LedgerOperation, Parameters)>>,
    receipts: Mutex<HashMap<ExternalRef, Receipt>>,
    bus: InMemoryEventBus,
    latest_block: AtomicU64,
}

impl MockLedgerClient {
    /// Accepting client with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of a future `submit`.
    pub fn push_result(&self, result: Result<ExternalRef, SubmissionError>) {
        self.script.lock().push_back(result);
    }

    /// Fail every unscripted `submit` with `error`.
    pub fn fail_always(&self, error: SubmissionError) {
        *self.always.lock() = Some(error);
    }

    /// Number of `submit` calls so far.
    pub fn submit_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Every `submit` call so far, in order.
    pub fn calls(&self) -> Vec<(LedgerOperation, Parameters)> {
        self.calls.lock().clone()
    }

    /// Make a receipt available.
    pub fn set_receipt(&self, receipt: Receipt) {
        self.receipts
            .lock()
            .insert(receipt.transaction_hash.clone(), receipt);
    }

    /// Set the reported latest block.
    pub fn set_latest_block(&self, block: u64) {
        self.latest_block.store(block, Ordering::SeqCst);
    }

    /// Deliver an event to current subscribers.
    pub async fn emit(&self, event: LedgerEvent) -> usize {
        self.bus.publish(event).await
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn submit(
        &self,
        operation: LedgerOperation,
        parameters: &Parameters,
    ) -> Result<ExternalRef, SubmissionError> {
        let call_number = {
            let mut calls = self.calls.lock();
            calls.push((operation, parameters.clone()));
            calls.len()
        };

        if let Some(result) = self.script.lock().pop_front() {
            return result;
        }
        if let Some(error) = self.always.lock().clone() {
            return Err(error);
        }
        Ok(ExternalRef::new(format!("0x{call_number:064x}")))
    }

    async fn subscribe(&self, filter: EventFilter) -> Result<LedgerEventStream, LedgerClientError> {
        Ok(Box::pin(self.bus.event_stream(filter)))
    }

    async fn receipt(&self, reference: &ExternalRef) -> Result<Option<Receipt>, LedgerClientError> {
        Ok(self.receipts.lock().get(reference).cloned())
    }

    async fn latest_block(&self) -> Result<u64, LedgerClientError> {
        Ok(self.latest_block.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReceiptStatus, TransportKind};
    use shared_types::{EventKind, ParamValue};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    fn params() -> Parameters {
        Parameters::new(vec![ParamValue::Uint(1), ParamValue::Uint(2)])
    }

    #[tokio::test]
    async fn test_mock_accepts_by_default() {
        let client = MockLedgerClient::new();
        let reference = client
            .submit(LedgerOperation::UpdateItemStatus, &params())
            .await
            .unwrap();

        assert!(reference.as_str().starts_with("0x"));
        assert_eq!(client.submit_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_script_then_always() {
        let client = MockLedgerClient::new();
        client.push_result(Ok(ExternalRef::new("0xabc")));
        client.fail_always(SubmissionError::transport(TransportKind::Timeout, "slow"));

        let first = client.submit(LedgerOperation::CreateItem, &params()).await;
        let second = client.submit(LedgerOperation::CreateItem, &params()).await;

        assert_eq!(first.unwrap(), ExternalRef::new("0xabc"));
        assert!(second.unwrap_err().is_retryable());
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_receipts_and_events() {
        let client = MockLedgerClient::new();
        client.set_receipt(Receipt {
            transaction_hash: ExternalRef::new("0xabc"),
            block_number: 3,
            status: ReceiptStatus::Reverted,
            events: vec![],
            revert_reason: Some("out of stock".to_string()),
        });
        assert!(client.receipt(&ExternalRef::new("0xABC")).await.unwrap().is_some());
        assert!(client.receipt(&ExternalRef::new("0xdef")).await.unwrap().is_none());

        let mut stream = client.subscribe(EventFilter::all()).await.unwrap();
        client
            .emit(LedgerEvent {
                kind: EventKind::ItemCreated,
                contract: "0xc0ffee".to_string(),
                fields: BTreeMap::new(),
                transaction_hash: ExternalRef::new("0xabc"),
                block_number: 3,
                log_index: 0,
            })
            .await;

        let event = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(event.block_number, 3);
    }
}
