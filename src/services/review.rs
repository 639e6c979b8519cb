//! Manual review workflow.
//!
//! Every paid transaction waits in PendingApproval for an explicit admin
//! decision. Approval and rejection are compare-and-swap writes, so two
//! reviewers racing on the same transaction resolve to exactly one winner.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionEvent};
use crate::error::AppError;
use crate::ports::{StoreError, TransactionStore, TransitionChange};
use crate::validation::{sanitize_string, validate_max_len, REASON_MAX_LEN};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

pub struct ReviewService {
    transactions: Arc<dyn TransactionStore>,
}

impl ReviewService {
    pub fn new(transactions: Arc<dyn TransactionStore>) -> Self {
        Self { transactions }
    }

    /// Admin queue, oldest first.
    pub async fn list_pending(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Transaction>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        self.transactions
            .list_pending_approval(limit, offset)
            .await
            .map_err(map_store)
    }

    pub async fn approve(&self, tx_id: Uuid, reviewer_id: Uuid) -> Result<Transaction, AppError> {
        let updated = self
            .decide(tx_id, reviewer_id, TransactionEvent::Approved, None)
            .await?;
        tracing::info!(
            transaction_id = %tx_id,
            reviewer_id = %reviewer_id,
            "transaction approved for payout"
        );
        Ok(updated)
    }

    /// Rejects a pending transaction. The reason is mandatory and is checked
    /// before anything is read or written.
    pub async fn reject(
        &self,
        tx_id: Uuid,
        reviewer_id: Uuid,
        reason: &str,
    ) -> Result<Transaction, AppError> {
        let reason = sanitize_string(reason);
        if reason.is_empty() {
            return Err(AppError::Validation(
                "a rejection reason is required".to_string(),
            ));
        }
        validate_max_len("reason", &reason, REASON_MAX_LEN)?;

        let updated = self
            .decide(tx_id, reviewer_id, TransactionEvent::Rejected, Some(reason.clone()))
            .await?;
        tracing::info!(
            transaction_id = %tx_id,
            reviewer_id = %reviewer_id,
            reason,
            "transaction rejected"
        );
        Ok(updated)
    }

    async fn decide(
        &self,
        tx_id: Uuid,
        reviewer_id: Uuid,
        event: TransactionEvent,
        reason: Option<String>,
    ) -> Result<Transaction, AppError> {
        let tx = self.transactions.get(tx_id).await.map_err(map_store)?;

        // Only PendingApproval has rows for these events; anything else comes
        // back as a 409 naming the observed status.
        let next = tx.status.apply(event)?;

        let mut change = TransitionChange::to(next).with_reviewer(reviewer_id, Utc::now());
        if let Some(reason) = reason {
            change = change.with_failure_reason(reason);
        }

        match self.transactions.transition(tx_id, tx.status, change).await {
            Ok(updated) => Ok(updated),
            Err(StoreError::StatusConflict { current }) => {
                Err(AppError::InvalidStateTransition { current, event })
            }
            Err(other) => Err(map_store(other)),
        }
    }
}

fn map_store(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound => AppError::NotFound("transaction not found".to_string()),
        StoreError::StatusConflict { current } => {
            AppError::Internal(format!("unexpected status conflict: {current}"))
        }
        StoreError::Backend(msg) => AppError::Internal(msg),
    }
}
