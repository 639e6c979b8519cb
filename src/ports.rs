//! Storage ports.
//!
//! Services talk to persistence through these traits only. The Postgres
//! adapter is the production implementation; the in-memory adapter backs the
//! integration tests with identical compare-and-swap semantics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    InternalLedgerEntry, NewLedgerEntry, Recipient, Transaction, TransactionStatus, User,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("status conflict: current status is '{current}'")]
    StatusConflict { current: TransactionStatus },

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Mutation applied by a status transition. The store must write the status,
/// the side-effect fields, and the ledger entries in one atomic commit, and
/// only if the row's current status still equals the expected one.
#[derive(Debug, Clone)]
pub struct TransitionChange {
    pub new_status: TransactionStatus,
    pub onramp_payment_intent_id: Option<String>,
    pub offramp_payout_reference: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub ledger_entries: Vec<NewLedgerEntry>,
}

impl TransitionChange {
    pub fn to(new_status: TransactionStatus) -> Self {
        Self {
            new_status,
            onramp_payment_intent_id: None,
            offramp_payout_reference: None,
            reviewed_by: None,
            reviewed_at: None,
            failure_reason: None,
            ledger_entries: Vec::new(),
        }
    }

    pub fn with_payment_intent(mut self, intent_id: impl Into<String>) -> Self {
        self.onramp_payment_intent_id = Some(intent_id.into());
        self
    }

    pub fn with_payout_reference(mut self, reference: impl Into<String>) -> Self {
        self.offramp_payout_reference = Some(reference.into());
        self
    }

    pub fn with_reviewer(mut self, reviewer_id: Uuid, at: DateTime<Utc>) -> Self {
        self.reviewed_by = Some(reviewer_id);
        self.reviewed_at = Some(at);
        self
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    pub fn with_ledger_entry(mut self, entry: NewLedgerEntry) -> Self {
        self.ledger_entries.push(entry);
        self
    }
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, tx: &Transaction) -> StoreResult<Transaction>;

    async fn get(&self, id: Uuid) -> StoreResult<Transaction>;

    /// Owner-scoped fetch; absent and not-owned are indistinguishable.
    async fn get_by_owner(&self, id: Uuid, user_id: Uuid) -> StoreResult<Transaction>;

    async fn list_by_owner(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Transaction>>;

    /// Admin review queue, oldest first.
    async fn list_pending_approval(&self, limit: i64, offset: i64)
        -> StoreResult<Vec<Transaction>>;

    async fn get_by_payment_intent(&self, intent_id: &str) -> StoreResult<Transaction>;

    /// Compare-and-swap over the status column. Fails with
    /// [`StoreError::StatusConflict`] when the row's status no longer equals
    /// `expected`; nothing is written in that case.
    async fn transition(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        change: TransitionChange,
    ) -> StoreResult<Transaction>;

    /// Ledger rows referencing a transaction, for reconciliation.
    async fn ledger_entries(&self, transaction_id: Uuid)
        -> StoreResult<Vec<InternalLedgerEntry>>;

    /// Connectivity probe for health reporting.
    async fn ping(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait RecipientStore: Send + Sync {
    async fn insert(&self, recipient: &Recipient) -> StoreResult<Recipient>;

    async fn get_by_owner(&self, id: Uuid, user_id: Uuid) -> StoreResult<Recipient>;

    async fn list_by_owner(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Recipient>>;

    /// The only mutable recipient field. A payout route that has been used
    /// must not silently drift, so payout details never change.
    async fn update_name(&self, id: Uuid, user_id: Uuid, full_name: &str)
        -> StoreResult<Recipient>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: Uuid) -> StoreResult<User>;

    async fn get_by_email(&self, email: &str) -> StoreResult<User>;
}
