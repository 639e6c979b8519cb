//! Admin review workflow tests: approval, rejection, and the concurrency
//! guarantee that exactly one reviewer wins a race.

use bigdecimal::BigDecimal;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use remity_core::adapters::InMemoryStore;
use remity_core::domain::{KycStatus, PayoutMethod, Recipient, TransactionStatus, User};
use remity_core::error::AppError;
use remity_core::ports::{RecipientStore, TransactionStore};
use remity_core::services::transactions::CreateTransactionRequest;
use remity_core::services::{ReviewService, SimulatedPaymentProvider, TransactionService};

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

struct Harness {
    store: InMemoryStore,
    service: TransactionService,
    review: ReviewService,
}

fn harness() -> Harness {
    let store = InMemoryStore::new();
    let supported = ["USD", "MXN"].into_iter().map(String::from).collect();
    let service = TransactionService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(SimulatedPaymentProvider::new()),
        supported,
    );
    let review = ReviewService::new(Arc::new(store.clone()));
    Harness {
        store,
        service,
        review,
    }
}

/// Drives a fresh transaction to PendingApproval and returns its id.
async fn pending_transaction(h: &Harness) -> Uuid {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4().simple()),
        full_name: "Sender".into(),
        is_admin: false,
        kyc_status: KycStatus::Verified,
        created_at: now,
        updated_at: now,
    };
    h.store.add_user(user.clone()).await;

    let recipient = Recipient::new(
        user.id,
        "Maria Lopez",
        "MX",
        PayoutMethod::SpeiClabe {
            clabe: "002010077777777771".into(),
        },
    )
    .unwrap();
    RecipientStore::insert(&h.store, &recipient).await.unwrap();

    let created = h
        .service
        .create(
            &user,
            CreateTransactionRequest {
                recipient_id: recipient.id,
                source_currency: "USD".into(),
                target_currency: "MXN".into(),
                source_amount: dec("100.00000000"),
                target_amount: dec("1985.00000000"),
                exchange_rate: dec("19.85"),
                remity_fee: dec("1.00"),
                payment_provider_fee: dec("3.20"),
                estimated_delivery_time: None,
            },
        )
        .await
        .unwrap();

    let intent_id = created.transaction.onramp_payment_intent_id.unwrap();
    let tx = h.service.on_payment_confirmed(&intent_id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::PendingApproval);
    tx.id
}

#[tokio::test]
async fn approve_records_reviewer_and_moves_to_processing() {
    let h = harness();
    let tx_id = pending_transaction(&h).await;
    let admin_id = Uuid::new_v4();

    let tx = h.review.approve(tx_id, admin_id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Processing);
    assert_eq!(tx.reviewed_by, Some(admin_id));
    assert!(tx.reviewed_at.is_some());
    assert!(tx.failure_reason.is_none());
}

#[tokio::test]
async fn reject_records_reason_and_reviewer() {
    let h = harness();
    let tx_id = pending_transaction(&h).await;
    let admin_id = Uuid::new_v4();

    let tx = h
        .review
        .reject(tx_id, admin_id, "sanctions screening hit")
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::ManuallyRejected);
    assert_eq!(tx.reviewed_by, Some(admin_id));
    assert_eq!(tx.failure_reason.as_deref(), Some("sanctions screening hit"));
}

#[tokio::test]
async fn reject_without_reason_mutates_nothing() {
    let h = harness();
    let tx_id = pending_transaction(&h).await;

    for reason in ["", "   "] {
        let err = h
            .review
            .reject(tx_id, Uuid::new_v4(), reason)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "accepted {reason:?}");
    }

    let tx = h.store.get(tx_id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::PendingApproval);
    assert!(tx.reviewed_by.is_none());
    assert!(tx.failure_reason.is_none());
}

#[tokio::test]
async fn approve_outside_pending_approval_leaves_record_untouched() {
    let h = harness();
    let tx_id = pending_transaction(&h).await;
    let first_admin = Uuid::new_v4();
    h.review.approve(tx_id, first_admin).await.unwrap();

    let err = h.review.approve(tx_id, Uuid::new_v4()).await.unwrap_err();
    match err {
        AppError::InvalidStateTransition { current, .. } => {
            assert_eq!(current, TransactionStatus::Processing)
        }
        other => panic!("expected state conflict, got {other:?}"),
    }

    // Attribution still belongs to the reviewer who won.
    let tx = h.store.get(tx_id).await.unwrap();
    assert_eq!(tx.reviewed_by, Some(first_admin));
}

#[tokio::test]
async fn concurrent_decisions_have_exactly_one_winner() {
    let h = harness();
    let tx_id = pending_transaction(&h).await;
    let approver = Uuid::new_v4();
    let rejecter = Uuid::new_v4();

    let (approved, rejected) = tokio::join!(
        h.review.approve(tx_id, approver),
        h.review.reject(tx_id, rejecter, "duplicate sender"),
    );

    assert!(
        approved.is_ok() != rejected.is_ok(),
        "exactly one decision must win: approve={approved:?} reject={rejected:?}"
    );

    let tx = h.store.get(tx_id).await.unwrap();
    match tx.status {
        TransactionStatus::Processing => assert_eq!(tx.reviewed_by, Some(approver)),
        TransactionStatus::ManuallyRejected => assert_eq!(tx.reviewed_by, Some(rejecter)),
        other => panic!("unexpected terminal review status {other}"),
    }
}

#[tokio::test]
async fn pending_queue_lists_oldest_first_and_pages() {
    let h = harness();
    let first = pending_transaction(&h).await;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = pending_transaction(&h).await;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let third = pending_transaction(&h).await;

    let queue = h.review.list_pending(None, None).await.unwrap();
    let ids: Vec<Uuid> = queue.iter().map(|tx| tx.id).collect();
    assert_eq!(ids, vec![first, second, third]);

    let page = h.review.list_pending(Some(1), Some(1)).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, second);

    // Decided transactions drop out of the queue.
    h.review.approve(first, Uuid::new_v4()).await.unwrap();
    let queue = h.review.list_pending(None, None).await.unwrap();
    assert_eq!(queue.len(), 2);
}

#[tokio::test]
async fn rejected_transaction_keeps_its_ledger_rows_intact() {
    let h = harness();
    let tx_id = pending_transaction(&h).await;

    let before = h.store.ledger_entries(tx_id).await.unwrap();
    h.review
        .reject(tx_id, Uuid::new_v4(), "payout route mismatch")
        .await
        .unwrap();
    let after = h.store.ledger_entries(tx_id).await.unwrap();

    // Rejection is a status decision, not a monetary event; the refund entry
    // only appears once ops confirms the refund.
    assert_eq!(before.len(), after.len());

    let tx = h.service.confirm_refund(tx_id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Refunded);
    assert_eq!(h.store.ledger_entries(tx_id).await.unwrap().len(), after.len() + 1);
}
