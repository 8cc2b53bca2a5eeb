//! # Reconciliation Flows
//!
//! Simulated ledger → event reconciler → coordinator → domain finalizers.
//!
//! ## Properties
//!
//! 1. A submitted item ends CONFIRMED with the ledger's hash and block
//! 2. A replayed event is applied at most once, with or without a checkpoint
//! 3. Events of one block may arrive in any order
//! 4. A restarted reconciler resumes from its checkpoint without gaps
//! 5. Lost events are recovered from receipts, including reverts
//! 6. Events written by other clients are mirrored; foreign contracts ignored

use super::fixtures::{LedgerNetwork, CARRIER, CHAIN, OWNER};
use shared_types::{LedgerStatus, TxStatus};
use sl_01_ledger_client::LedgerClient;
use sl_03_submission_coordinator::SubmissionOutcome;
use sl_04_event_reconciler::{CheckpointStore, ReconcileOutcome, ReconcilerApi};
use sl_05_domain_adapters::{
    AllocationState, ItemLifecycleApi, LedgerCall, MaterialInput, ProcessItemRequest,
};
use std::time::Duration;
use tokio::time::timeout;
use tokio_stream::StreamExt;

const WAIT: Duration = Duration::from_secs(5);
const STALE_AFTER: Duration = Duration::from_secs(10 * 60);

// =============================================================================
// HAPPY PATH
// =============================================================================

#[tokio::test]
async fn test_created_item_confirmed_by_its_event() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;

    let intent = net
        .items()
        .create_item(net.create_request(42, 100))
        .await
        .unwrap();

    let item = net.item(42);
    assert!(item.ledger.is_pending());
    assert_eq!(item.ledger.record_id, Some(intent.record_id));
    assert_eq!(net.record(intent.record_id).status, TxStatus::Pending);

    net.until_accepted(intent.record_id).await;
    let accepted_hash = net.record(intent.record_id).external_reference.unwrap();

    let outcomes = net.settle().await;
    assert_eq!(
        outcomes,
        vec![ReconcileOutcome::Confirmed {
            record_id: intent.record_id
        }]
    );

    let outcome = timeout(WAIT, intent.outcome.wait()).await.unwrap().unwrap();
    assert_eq!(
        outcome,
        SubmissionOutcome::Confirmed {
            external_reference: Some(accepted_hash.clone())
        }
    );

    let record = net.record(intent.record_id);
    assert_eq!(record.status, TxStatus::Confirmed);
    assert!(record.confirmed_at.is_some());
    assert_eq!(record.block_number, Some(3));

    let item = net.item(42);
    assert_eq!(item.ledger.ledger_status, Some(LedgerStatus::Confirmed));
    assert_eq!(item.ledger.external_reference, Some(accepted_hash));
    assert_eq!(item.supply_chain_id, CHAIN);
    assert_eq!(item.balance(OWNER), 100);
}

// =============================================================================
// REPLAY
// =============================================================================

#[tokio::test]
async fn test_replayed_transfer_event_applied_once() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;

    let intent = net.items().transfer_item(42, OWNER, CARRIER, 30).await.unwrap();
    net.until_accepted(intent.record_id).await;
    let events = net.mine().await;

    assert_eq!(
        net.reconcile(&events).await,
        vec![ReconcileOutcome::Confirmed {
            record_id: intent.record_id
        }]
    );
    assert_eq!(
        net.reconcile(&events).await,
        vec![ReconcileOutcome::Duplicate]
    );

    // Without a checkpoint the terminal record still recognises the hash.
    let amnesiac = net.amnesiac_reconciler();
    assert_eq!(
        amnesiac.handle_event(&events[0]).await.unwrap(),
        ReconcileOutcome::Duplicate
    );

    let item = net.item(42);
    assert_eq!(item.balance(OWNER), 70);
    assert_eq!(item.balance(CARRIER), 30);
    assert!(item.pending_transfers.is_empty());
    assert_eq!(net.reconciler.stats().duplicates, 1);
}

// =============================================================================
// ORDERING
// =============================================================================

#[tokio::test]
async fn test_child_events_before_parent_creation() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;

    // Parent and child submitted before anything is mined.
    let parent = net
        .items()
        .create_item(net.create_request(42, 100))
        .await
        .unwrap();
    let allocation = net
        .items()
        .process_item(ProcessItemRequest {
            child_item_id: 43,
            supply_chain_id: CHAIN,
            quantity: 10,
            item_type: "roasted".to_string(),
            owner: OWNER.to_string(),
            inputs: vec![MaterialInput {
                parent_item_id: 42,
                quantity: 30,
            }],
        })
        .await
        .unwrap();
    assert_eq!(allocation.steps.len(), 1);

    net.until_accepted(parent.record_id).await;
    net.until_accepted(allocation.child.record_id).await;
    net.until_accepted(allocation.steps[0].record_id).await;

    let mut events = net.mine().await;
    assert_eq!(events.len(), 3);
    events.reverse();
    for (index, event) in events.iter_mut().enumerate() {
        event.log_index = index as u32;
    }

    let outcomes = net.reconcile(&events).await;
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, ReconcileOutcome::Confirmed { .. })));

    for id in [
        parent.record_id,
        allocation.child.record_id,
        allocation.steps[0].record_id,
    ] {
        assert_eq!(net.record(id).status, TxStatus::Confirmed);
    }

    let parent = net.item(42);
    assert!(parent.ledger.is_confirmed());
    assert_eq!(parent.balance(OWNER), 70);

    let child = net.item(43);
    assert!(child.ledger.is_confirmed());
    assert_eq!(child.balance(OWNER), 10);
    assert_eq!(
        child.allocation.as_ref().map(|a| a.state),
        Some(AllocationState::Complete)
    );
}

// =============================================================================
// CHECKPOINT RESUME
// =============================================================================

#[tokio::test]
async fn test_restart_resumes_from_checkpoint() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    let checkpoint = net.checkpoints.load().unwrap().unwrap();
    assert_eq!(checkpoint.block_number, 2);

    // Mined while the reconciler was down.
    let intent = net
        .items()
        .create_item(net.create_request(42, 100))
        .await
        .unwrap();
    net.until_accepted(intent.record_id).await;
    net.mine().await;
    assert!(net.item(42).ledger.is_pending());

    let restarted = net.restarted_reconciler();
    let mut stream = restarted.open_stream().await.unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let event = timeout(WAIT, stream.next()).await.unwrap().unwrap();
        outcomes.push(restarted.handle_event(&event).await.unwrap());
    }

    // The checkpoint block is replayed inclusively and skipped.
    assert_eq!(
        outcomes,
        vec![
            ReconcileOutcome::Duplicate,
            ReconcileOutcome::Confirmed {
                record_id: intent.record_id
            },
        ]
    );
    assert!(net.item(42).ledger.is_confirmed());
    assert_eq!(net.checkpoints.load().unwrap().unwrap().block_number, 3);
}

// =============================================================================
// RECEIPT RECOVERY
// =============================================================================

#[tokio::test]
async fn test_lost_events_recovered_from_receipts() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;

    net.ledger.revert_next("insufficient stock on ledger");
    let reverted = net.items().transfer_item(42, OWNER, CARRIER, 30).await.unwrap();
    net.until_accepted(reverted.record_id).await;
    let landed = net.items().transfer_item(42, OWNER, CARRIER, 20).await.unwrap();
    net.until_accepted(landed.record_id).await;

    // Mined, but the events never reach the reconciler.
    net.mine().await;
    assert_eq!(net.item(42).balance(OWNER), 50);

    let report = net.reconciler.recover_stale(STALE_AFTER).await.unwrap();
    assert_eq!(report.stale, 0);

    net.time.advance(11 * 60 * 1000);
    let report = net.reconciler.recover_stale(STALE_AFTER).await.unwrap();

    assert_eq!(report.stale, 2);
    assert_eq!(report.confirmed, vec![landed.record_id]);
    assert_eq!(report.reverted, vec![reverted.record_id]);

    let failed = net.record(reverted.record_id);
    assert_eq!(failed.status, TxStatus::Failed);
    assert!(failed
        .failure_reason
        .as_deref()
        .is_some_and(|r| r.starts_with("reverted")));
    assert_eq!(net.record(landed.record_id).status, TxStatus::Confirmed);

    let item = net.item(42);
    assert_eq!(item.balance(OWNER), 80);
    assert_eq!(item.balance(CARRIER), 20);
    assert!(item.pending_transfers.is_empty());

    let outcome = timeout(WAIT, reverted.outcome.wait()).await.unwrap().unwrap();
    assert!(!outcome.is_confirmed());
}

#[tokio::test]
async fn test_unmined_submission_stays_pending() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;

    let intent = net
        .items()
        .create_item(net.create_request(42, 100))
        .await
        .unwrap();
    net.until_accepted(intent.record_id).await;
    net.time.advance(11 * 60 * 1000);

    let report = net.reconciler.recover_stale(STALE_AFTER).await.unwrap();

    assert_eq!(report.stale, 1);
    assert_eq!(report.still_pending, 1);
    assert!(report.confirmed.is_empty());
    assert_eq!(net.record(intent.record_id).status, TxStatus::Pending);
}

// =============================================================================
// UNMATCHED AND FOREIGN EVENTS
// =============================================================================

#[tokio::test]
async fn test_transfer_by_another_client_is_mirrored() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;
    let records_before = net.records.len();

    let call = LedgerCall::Transfer {
        item_id: 42,
        from: OWNER.to_string(),
        to: CARRIER.to_string(),
        quantity: 25,
    };
    net.ledger
        .submit(call.operation(), &call.to_parameters())
        .await
        .unwrap();

    assert_eq!(net.settle().await, vec![ReconcileOutcome::Unmatched]);

    let item = net.item(42);
    assert_eq!(item.balance(OWNER), 75);
    assert_eq!(item.balance(CARRIER), 25);
    assert_eq!(net.records.len(), records_before);
    assert_eq!(net.reconciler.stats().unmatched, 1);
}

#[tokio::test]
async fn test_foreign_contract_event_ignored() {
    let net = LedgerNetwork::new();
    net.confirmed_chain().await;
    net.confirmed_item(42, 100).await;

    let mut event = net.ledger.event_log().pop().unwrap();
    event.contract = "0xdeadbeef".to_string();
    event.block_number += 1;

    assert_eq!(
        net.reconciler.handle_event(&event).await.unwrap(),
        ReconcileOutcome::Ignored
    );
    assert_eq!(net.item(42).balance(OWNER), 100);
    assert!(net.reconciler.dead_letters().is_empty());
}
