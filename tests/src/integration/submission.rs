//! # Submission Flows
//!
//! Domain adapter → coordinator → ledger client, checked from both ends:
//! what the ledger saw, and what the records and entities say afterwards.
//!
//! ## Properties
//!
//! 1. Identical in-flight intents reach the ledger once
//! 2. Transport failures stop at the retry budget and compensate
//! 3. Local validation failures leave no record and make no ledger call
//! 4. A resolved record never changes status again
//! 5. An item's ledger status follows its latest unresolved mutation

use super::fixtures::{LedgerNetwork, CARRIER, MAX_RETRIES, OWNER};
use shared_types::{LedgerStatus, TxStatus};
use sl_01_ledger_client::{MockLedgerClient, SubmissionError, TransportKind};
use sl_03_submission_coordinator::{
    ConfirmationEvidence, ReconciliationApi, SubmissionOutcome, MAX_RETRIES_EXCEEDED,
};
use sl_05_domain_adapters::{
    ChainRegistrationApi, DomainError, EntityStore, ItemLifecycleApi, ItemStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

// =============================================================================
// IDEMPOTENCY
// =============================================================================

#[tokio::test]
async fn test_identical_intents_reach_ledger_once() {
    let net = LedgerNetwork::new();

    let first = net.chains().create_chain(9, "Tea", OWNER).await.unwrap();
    let second = net.chains().create_chain(9, "Tea", OWNER).await.unwrap();

    assert_eq!(first.redundant_of, None);
    assert_eq!(second.redundant_of, Some(first.record_id));
    assert_eq!(net.record(second.record_id).status, TxStatus::Redundant);

    net.until_accepted(first.record_id).await;
    tokio::task::yield_now().await;
    assert_eq!(net.ledger.pending_count(), 1);

    net.settle().await;

    let outcome = timeout(WAIT, second.outcome.wait()).await.unwrap().unwrap();
    assert!(outcome.is_confirmed());
    assert_eq!(net.record(first.record_id).status, TxStatus::Confirmed);
    assert_eq!(net.record(second.record_id).status, TxStatus::Redundant);
    assert_eq!(net.ledger.event_log().len(), 1);
}

#[tokio::test]
async fn test_identical_intent_after_resolution_is_submitted_again() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;

    let first = net.items().transfer_item(42, OWNER, CARRIER, 10).await.unwrap();
    net.accept_and_settle(first.record_id).await;

    // Same parameters, but the first transfer is no longer in flight.
    let second = net.items().transfer_item(42, OWNER, CARRIER, 10).await.unwrap();
    assert_eq!(second.redundant_of, None);
    net.accept_and_settle(second.record_id).await;

    let item = net.item(42);
    assert_eq!(item.balance(OWNER), 80);
    assert_eq!(item.balance(CARRIER), 20);
}

// =============================================================================
// RETRY BOUND
// =============================================================================

#[tokio::test]
async fn test_unlimited_transport_failures_stop_at_budget() {
    let client = Arc::new(MockLedgerClient::new());
    client.fail_always(SubmissionError::transport(
        TransportKind::Timeout,
        "upstream timed out",
    ));
    let net = LedgerNetwork::scripted(Arc::clone(&client));

    let intent = net.chains().create_chain(9, "Tea", OWNER).await.unwrap();
    let outcome = timeout(WAIT, intent.outcome.wait()).await.unwrap().unwrap();

    let SubmissionOutcome::Failed { reason } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(reason.contains(MAX_RETRIES_EXCEEDED));
    assert_eq!(client.submit_calls(), MAX_RETRIES as usize);

    let record = net.record(intent.record_id);
    assert_eq!(record.status, TxStatus::Failed);
    assert_eq!(record.retry_count, MAX_RETRIES);
    assert!(record.external_reference.is_none());

    let chain = net.entities.load_chain(9).unwrap().unwrap();
    assert_eq!(chain.ledger.ledger_status, Some(LedgerStatus::Failed));
}

#[tokio::test]
async fn test_timed_out_transfer_refunds_sender() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;

    net.ledger.fail_next(MAX_RETRIES as usize, TransportKind::Timeout);
    let intent = net.items().transfer_item(42, OWNER, CARRIER, 30).await.unwrap();

    // Applied optimistically before the ledger has seen anything.
    let item = net.item(42);
    assert_eq!(item.balance(OWNER), 70);
    assert_eq!(item.status, ItemStatus::InTransit);
    let creation = item.creation_ledger().clone();
    assert!(item.ledger.is_owned_by(intent.record_id));

    let outcome = timeout(WAIT, intent.outcome.wait()).await.unwrap().unwrap();
    assert!(!outcome.is_confirmed());

    let record = net.record(intent.record_id);
    assert_eq!(record.status, TxStatus::Failed);
    assert_eq!(record.retry_count, MAX_RETRIES);
    assert!(record
        .failure_reason
        .as_deref()
        .is_some_and(|r| r.contains(MAX_RETRIES_EXCEEDED)));

    let item = net.item(42);
    assert_eq!(item.balance(OWNER), 100);
    assert_eq!(item.balance(CARRIER), 0);
    assert_eq!(item.status, ItemStatus::Created);
    assert!(item.pending_transfers.is_empty());
    assert_eq!(item.ledger, creation);
    assert_eq!(net.ledger.pending_count(), 0);
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;

    net.ledger.fail_next(1, TransportKind::ConnectionReset);
    let intent = net.items().create_item(net.create_request(42, 100)).await.unwrap();
    net.accept_and_settle(intent.record_id).await;

    let record = net.record(intent.record_id);
    assert_eq!(record.status, TxStatus::Confirmed);
    assert_eq!(record.retry_count, 1);
    assert!(net.item(42).ledger.is_confirmed());
}

#[tokio::test]
async fn test_rejection_fails_without_retry() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;

    net.ledger.reject_next("execution reverted: item exists");
    let intent = net.items().create_item(net.create_request(42, 100)).await.unwrap();
    let outcome = timeout(WAIT, intent.outcome.wait()).await.unwrap().unwrap();

    assert!(!outcome.is_confirmed());
    let record = net.record(intent.record_id);
    assert_eq!(record.status, TxStatus::Failed);
    assert_eq!(record.retry_count, 0);
    assert!(net.item(42).ledger.is_failed());
}

// =============================================================================
// LOCAL VALIDATION
// =============================================================================

#[tokio::test]
async fn test_overdraw_leaves_no_record_and_no_ledger_call() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;
    let records_before = net.records.len();
    let events_before = net.ledger.event_log().len();

    let err = net
        .items()
        .transfer_item(42, OWNER, CARRIER, 101)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DomainError::InsufficientQuantity {
            item_id: 42,
            available: 100,
            requested: 101,
            ..
        }
    ));
    assert_eq!(net.records.len(), records_before);
    assert_eq!(net.ledger.pending_count(), 0);
    net.mine().await;
    assert_eq!(net.ledger.event_log().len(), events_before);
    assert_eq!(net.item(42).balance(OWNER), 100);
}

#[tokio::test]
async fn test_unauthorized_caller_rejected_locally() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    let records_before = net.records.len();

    let mut request = net.create_request(42, 100);
    request.owner = "0xmallory".to_string();
    let err = net.items().create_item(request).await.unwrap_err();

    assert!(matches!(err, DomainError::NotAuthorized { chain_id: 7, .. }));
    assert_eq!(net.records.len(), records_before);
    assert_eq!(net.ledger.pending_count(), 0);
}

// =============================================================================
// MONOTONIC STATUS
// =============================================================================

#[tokio::test]
async fn test_confirmed_record_cannot_be_failed_or_abandoned() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;
    let record_id = net.item(42).ledger.record_id.unwrap();

    assert!(net
        .coordinator
        .fail_accepted(record_id, "late revert")
        .await
        .is_err());
    assert!(net.coordinator.abandon(record_id, "operator").await.is_err());

    let record = net.record(record_id);
    assert_eq!(record.status, TxStatus::Confirmed);
    assert!(record.failure_reason.is_none());
    assert!(net.item(42).ledger.is_confirmed());
}

#[tokio::test]
async fn test_failed_record_ignores_late_confirmation() {
    let client = Arc::new(MockLedgerClient::new());
    client.fail_always(SubmissionError::transport(
        TransportKind::Unavailable,
        "node down",
    ));
    let net = LedgerNetwork::scripted(client);

    let intent = net.chains().create_chain(9, "Tea", OWNER).await.unwrap();
    timeout(WAIT, intent.outcome.wait()).await.unwrap().unwrap();

    let late = net
        .coordinator
        .confirm(
            intent.record_id,
            ConfirmationEvidence {
                transaction_hash: shared_types::ExternalRef::new("0xlate"),
                block_number: Some(3),
                event: None,
            },
        )
        .await;

    assert!(late.is_err());
    assert_eq!(net.record(intent.record_id).status, TxStatus::Failed);
    let chain = net.entities.load_chain(9).unwrap().unwrap();
    assert_eq!(chain.ledger.ledger_status, Some(LedgerStatus::Failed));
}

// =============================================================================
// LEDGER STATUS OF MUTATED ITEMS
// =============================================================================

#[tokio::test]
async fn test_transfer_marks_item_pending_until_confirmed() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;
    assert!(net.item(42).ledger.is_confirmed());

    let intent = net.items().transfer_item(42, OWNER, CARRIER, 30).await.unwrap();

    let item = net.item(42);
    assert_eq!(item.ledger.ledger_status, Some(LedgerStatus::Pending));
    assert!(item.ledger.is_owned_by(intent.record_id));
    assert!(item.creation_ledger().is_confirmed());

    net.accept_and_settle(intent.record_id).await;
    let hash = net.record(intent.record_id).external_reference;

    let item = net.item(42);
    assert_eq!(item.ledger.ledger_status, Some(LedgerStatus::Confirmed));
    assert_eq!(item.ledger.external_reference, hash);
    assert_eq!(item.balance(CARRIER), 30);
    // Delivery is a separate status update.
    assert_eq!(item.status, ItemStatus::InTransit);
}

#[tokio::test]
async fn test_status_update_marks_item_pending_until_confirmed() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;

    let intent = net
        .items()
        .update_item_status(42, ItemStatus::Delivered, OWNER)
        .await
        .unwrap();
    assert!(net.item(42).ledger.is_pending());

    net.accept_and_settle(intent.record_id).await;

    let item = net.item(42);
    assert!(item.ledger.is_confirmed());
    assert!(item.ledger.is_owned_by(intent.record_id));
    assert_eq!(item.status, ItemStatus::Delivered);
}
