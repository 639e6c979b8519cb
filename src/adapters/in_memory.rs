//! In-memory store.
//!
//! Backs the integration tests and local development. All maps live behind a
//! single `RwLock`, so a transition's status check, field writes and ledger
//! appends happen under one write-lock scope, which gives the same
//! compare-and-swap guarantee the Postgres adapter gets from a conditional
//! UPDATE inside a database transaction.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{InternalLedgerEntry, Recipient, Transaction, TransactionStatus, User};
use crate::ports::{
    RecipientStore, StoreError, StoreResult, TransactionStore, TransitionChange, UserStore,
};

#[derive(Default)]
struct Inner {
    transactions: HashMap<Uuid, Transaction>,
    recipients: HashMap<Uuid, Recipient>,
    users: HashMap<Uuid, User>,
    ledger: Vec<InternalLedgerEntry>,
    next_ledger_id: i64,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user. Registration itself is outside this crate's scope, so
    /// tests and local setups insert users directly.
    pub async fn add_user(&self, user: User) {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id, user);
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn insert(&self, tx: &Transaction) -> StoreResult<Transaction> {
        let mut inner = self.inner.write().await;
        inner.transactions.insert(tx.id, tx.clone());
        Ok(tx.clone())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Transaction> {
        let inner = self.inner.read().await;
        inner.transactions.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_by_owner(&self, id: Uuid, user_id: Uuid) -> StoreResult<Transaction> {
        let inner = self.inner.read().await;
        inner
            .transactions
            .get(&id)
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_by_owner(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let inner = self.inner.read().await;
        let mut owned: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(owned, limit, offset))
    }

    async fn list_pending_approval(
        &self,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let inner = self.inner.read().await;
        let mut pending: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|tx| tx.status == TransactionStatus::PendingApproval)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(page(pending, limit, offset))
    }

    async fn get_by_payment_intent(&self, intent_id: &str) -> StoreResult<Transaction> {
        let inner = self.inner.read().await;
        inner
            .transactions
            .values()
            .find(|tx| tx.onramp_payment_intent_id.as_deref() == Some(intent_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        change: TransitionChange,
    ) -> StoreResult<Transaction> {
        let mut inner = self.inner.write().await;

        let current = inner
            .transactions
            .get(&id)
            .map(|tx| tx.status)
            .ok_or(StoreError::NotFound)?;
        if current != expected {
            return Err(StoreError::StatusConflict { current });
        }

        let now = Utc::now();
        let mut entries = Vec::with_capacity(change.ledger_entries.len());
        for new_entry in &change.ledger_entries {
            inner.next_ledger_id += 1;
            entries.push(InternalLedgerEntry {
                id: inner.next_ledger_id,
                transaction_id: new_entry.transaction_id,
                event_type: new_entry.event_type,
                currency: new_entry.currency.clone(),
                amount: new_entry.amount.clone(),
                description: new_entry.description.clone(),
                created_at: now,
            });
        }
        inner.ledger.extend(entries);

        let tx = inner.transactions.get_mut(&id).expect("checked above");
        tx.status = change.new_status;
        if let Some(intent_id) = change.onramp_payment_intent_id {
            tx.onramp_payment_intent_id = Some(intent_id);
        }
        if let Some(reference) = change.offramp_payout_reference {
            tx.offramp_payout_reference = Some(reference);
        }
        if let Some(reviewer) = change.reviewed_by {
            tx.reviewed_by = Some(reviewer);
        }
        if let Some(at) = change.reviewed_at {
            tx.reviewed_at = Some(at);
        }
        if let Some(reason) = change.failure_reason {
            tx.failure_reason = Some(reason);
        }
        tx.updated_at = now;

        Ok(tx.clone())
    }

    async fn ledger_entries(
        &self,
        transaction_id: Uuid,
    ) -> StoreResult<Vec<InternalLedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ledger
            .iter()
            .filter(|entry| entry.transaction_id == Some(transaction_id))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl RecipientStore for InMemoryStore {
    async fn insert(&self, recipient: &Recipient) -> StoreResult<Recipient> {
        let mut inner = self.inner.write().await;
        inner.recipients.insert(recipient.id, recipient.clone());
        Ok(recipient.clone())
    }

    async fn get_by_owner(&self, id: Uuid, user_id: Uuid) -> StoreResult<Recipient> {
        let inner = self.inner.read().await;
        inner
            .recipients
            .get(&id)
            .filter(|r| r.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_by_owner(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Recipient>> {
        let inner = self.inner.read().await;
        let mut owned: Vec<Recipient> = inner
            .recipients
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(owned, limit, offset))
    }

    async fn update_name(
        &self,
        id: Uuid,
        user_id: Uuid,
        full_name: &str,
    ) -> StoreResult<Recipient> {
        let mut inner = self.inner.write().await;
        let recipient = inner
            .recipients
            .get_mut(&id)
            .filter(|r| r.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        recipient.full_name = full_name.to_string();
        recipient.updated_at = Utc::now();
        Ok(recipient.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get(&self, id: Uuid) -> StoreResult<User> {
        let inner = self.inner.read().await;
        inner.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KycStatus, QuoteFields, TransactionEvent};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sample_tx() -> Transaction {
        Transaction::from_quote(
            Uuid::new_v4(),
            Uuid::new_v4(),
            QuoteFields {
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
    }

    #[tokio::test]
    async fn transition_rejects_stale_expected_status() {
        let store = InMemoryStore::new();
        let tx = sample_tx();
        TransactionStore::insert(&store, &tx).await.unwrap();

        let updated = store
            .transition(
                tx.id,
                TransactionStatus::QuoteCreated,
                TransitionChange::to(TransactionStatus::PendingPayment)
                    .with_payment_intent("pi_123"),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TransactionStatus::PendingPayment);

        // Second writer still expects QuoteCreated.
        let err = store
            .transition(
                tx.id,
                TransactionStatus::QuoteCreated,
                TransitionChange::to(TransactionStatus::Cancelled),
            )
            .await
            .unwrap_err();
        match err {
            StoreError::StatusConflict { current } => {
                assert_eq!(current, TransactionStatus::PendingPayment)
            }
            other => panic!("expected status conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn owner_scoping_hides_foreign_transactions() {
        let store = InMemoryStore::new();
        let tx = sample_tx();
        TransactionStore::insert(&store, &tx).await.unwrap();

        assert!(TransactionStore::get_by_owner(&store, tx.id, tx.user_id).await.is_ok());
        assert!(matches!(
            TransactionStore::get_by_owner(&store, tx.id, Uuid::new_v4()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn failed_transition_leaves_ledger_untouched() {
        let store = InMemoryStore::new();
        let tx = sample_tx();
        TransactionStore::insert(&store, &tx).await.unwrap();

        let change = TransitionChange::to(TransactionStatus::PendingApproval).with_ledger_entry(
            crate::domain::NewLedgerEntry {
                transaction_id: Some(tx.id),
                event_type: crate::domain::LedgerEventType::FiatDepositConfirmed,
                currency: "USD".into(),
                amount: dec("100.00000000"),
                description: None,
            },
        );
        // Wrong expected status: the whole change must be a no-op.
        let result = store
            .transition(tx.id, TransactionStatus::PendingPayment, change)
            .await;
        assert!(result.is_err());
        assert!(store.ledger_entries(tx.id).await.unwrap().is_empty());

        let unchanged = TransactionStore::get(&store, tx.id).await.unwrap();
        assert_eq!(unchanged.status, TransactionStatus::QuoteCreated);
    }

    #[tokio::test]
    async fn pending_queue_is_oldest_first() {
        let store = InMemoryStore::new();
        let mut first = sample_tx();
        first.status = TransactionStatus::PendingApproval;
        let mut second = sample_tx();
        second.status = TransactionStatus::PendingApproval;
        second.created_at = first.created_at + chrono::Duration::seconds(5);
        TransactionStore::insert(&store, &second).await.unwrap();
        TransactionStore::insert(&store, &first).await.unwrap();

        let queue = store.list_pending_approval(10, 0).await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].id, first.id);
    }

    #[tokio::test]
    async fn user_lookup_by_email() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "sender@example.com".into(),
            full_name: "Sender".into(),
            is_admin: false,
            kyc_status: KycStatus::Verified,
            created_at: now,
            updated_at: now,
        };
        store.add_user(user.clone()).await;
        assert_eq!(
            UserStore::get_by_email(&store, "sender@example.com")
                .await
                .unwrap()
                .id,
            user.id
        );
    }

    #[tokio::test]
    async fn event_helper_note_payment_received_is_collapsed() {
        // Keep the store behavior in sync with the domain table: a webhook
        // confirmation expects PendingPayment and lands in PendingApproval.
        let next = TransactionStatus::PendingPayment
            .apply(TransactionEvent::PaymentConfirmed)
            .unwrap();
        assert_eq!(next, TransactionStatus::PendingApproval);
    }
}
