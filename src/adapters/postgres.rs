//! Postgres store.
//!
//! Status transitions use a conditional UPDATE (`WHERE id = $1 AND status = $2`)
//! and check the affected-row count, so concurrent writers serialize through a
//! per-row compare-and-swap instead of a blind overwrite. The status write and
//! any ledger appends commit in the same database transaction.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{
    InternalLedgerEntry, LedgerEventType, PayoutMethod, Recipient, Transaction,
    TransactionStatus, User,
};
use crate::ports::{
    RecipientStore, StoreError, StoreResult, TransactionStore, TransitionChange, UserStore,
};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[async_trait]
impl TransactionStore for PostgresStore {
    async fn insert(&self, tx: &Transaction) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            INSERT INTO transactions (
                id, user_id, recipient_id, source_currency, target_currency,
                source_amount, target_amount, exchange_rate, remity_fee,
                payment_provider_fee, status, estimated_delivery_time,
                onramp_payment_intent_id, offramp_payout_reference,
                failure_reason, reviewed_by, reviewed_at, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19
            )
            RETURNING *
            "#,
        )
        .bind(tx.id)
        .bind(tx.user_id)
        .bind(tx.recipient_id)
        .bind(&tx.source_currency)
        .bind(&tx.target_currency)
        .bind(&tx.source_amount)
        .bind(&tx.target_amount)
        .bind(&tx.exchange_rate)
        .bind(&tx.remity_fee)
        .bind(&tx.payment_provider_fee)
        .bind(tx.status.as_str())
        .bind(&tx.estimated_delivery_time)
        .bind(&tx.onramp_payment_intent_id)
        .bind(&tx.offramp_payout_reference)
        .bind(&tx.failure_reason)
        .bind(tx.reviewed_by)
        .bind(tx.reviewed_at)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }

    async fn get(&self, id: Uuid) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(StoreError::NotFound)?.into_domain()
    }

    async fn get_by_owner(&self, id: Uuid, user_id: Uuid) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound)?.into_domain()
    }

    async fn list_by_owner(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn list_pending_approval(
        &self,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE status = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(TransactionStatus::PendingApproval.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn get_by_payment_intent(&self, intent_id: &str) -> StoreResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE onramp_payment_intent_id = $1",
        )
        .bind(intent_id)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound)?.into_domain()
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        change: TransitionChange,
    ) -> StoreResult<Transaction> {
        let mut db_tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                status = $3,
                onramp_payment_intent_id = COALESCE($4, onramp_payment_intent_id),
                offramp_payout_reference = COALESCE($5, offramp_payout_reference),
                reviewed_by = COALESCE($6, reviewed_by),
                reviewed_at = COALESCE($7, reviewed_at),
                failure_reason = COALESCE($8, failure_reason),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(change.new_status.as_str())
        .bind(&change.onramp_payment_intent_id)
        .bind(&change.offramp_payout_reference)
        .bind(change.reviewed_by)
        .bind(change.reviewed_at)
        .bind(&change.failure_reason)
        .execute(&mut *db_tx)
        .await?;

        if result.rows_affected() == 0 {
            db_tx.rollback().await?;
            // Distinguish a lost race from a missing row.
            let current: Option<String> =
                sqlx::query_scalar("SELECT status FROM transactions WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
            return match current {
                Some(status) => Err(StoreError::StatusConflict {
                    current: parse_status(&status)?,
                }),
                None => Err(StoreError::NotFound),
            };
        }

        for entry in &change.ledger_entries {
            sqlx::query(
                r#"
                INSERT INTO internal_ledger (transaction_id, event_type, currency, amount, description)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(entry.transaction_id)
            .bind(entry.event_type.as_str())
            .bind(&entry.currency)
            .bind(&entry.amount)
            .bind(&entry.description)
            .execute(&mut *db_tx)
            .await?;
        }

        let row =
            sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
                .bind(id)
                .fetch_one(&mut *db_tx)
                .await?;

        db_tx.commit().await?;
        row.into_domain()
    }

    async fn ledger_entries(
        &self,
        transaction_id: Uuid,
    ) -> StoreResult<Vec<InternalLedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT * FROM internal_ledger WHERE transaction_id = $1 ORDER BY id ASC",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(LedgerRow::into_domain).collect()
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RecipientStore for PostgresStore {
    async fn insert(&self, recipient: &Recipient) -> StoreResult<Recipient> {
        let payout = serde_json::to_value(&recipient.payout)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let row = sqlx::query_as::<_, RecipientRow>(
            r#"
            INSERT INTO recipients (id, user_id, full_name, country_code, payout, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(recipient.id)
        .bind(recipient.user_id)
        .bind(&recipient.full_name)
        .bind(&recipient.country_code)
        .bind(payout)
        .bind(recipient.created_at)
        .bind(recipient.updated_at)
        .fetch_one(&self.pool)
        .await?;
        row.into_domain()
    }

    async fn get_by_owner(&self, id: Uuid, user_id: Uuid) -> StoreResult<Recipient> {
        let row = sqlx::query_as::<_, RecipientRow>(
            "SELECT * FROM recipients WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound)?.into_domain()
    }

    async fn list_by_owner(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Recipient>> {
        let rows = sqlx::query_as::<_, RecipientRow>(
            r#"
            SELECT * FROM recipients
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RecipientRow::into_domain).collect()
    }

    async fn update_name(
        &self,
        id: Uuid,
        user_id: Uuid,
        full_name: &str,
    ) -> StoreResult<Recipient> {
        let row = sqlx::query_as::<_, RecipientRow>(
            r#"
            UPDATE recipients SET full_name = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(full_name)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound)?.into_domain()
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn get(&self, id: Uuid) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(StoreError::NotFound)?.into_domain()
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(StoreError::NotFound)?.into_domain()
    }
}

fn parse_status(raw: &str) -> Result<TransactionStatus, StoreError> {
    TransactionStatus::from_str(raw).map_err(StoreError::Backend)
}

/// Internal row types. Status and payout details are stored as text/JSONB and
/// parsed into the closed domain types on the way out; an unparseable value is
/// a backend error, never a silently-propagated string.
#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    recipient_id: Uuid,
    source_currency: String,
    target_currency: String,
    source_amount: BigDecimal,
    target_amount: BigDecimal,
    exchange_rate: BigDecimal,
    remity_fee: BigDecimal,
    payment_provider_fee: BigDecimal,
    status: String,
    estimated_delivery_time: Option<String>,
    onramp_payment_intent_id: Option<String>,
    offramp_payout_reference: Option<String>,
    failure_reason: Option<String>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> StoreResult<Transaction> {
        Ok(Transaction {
            id: self.id,
            user_id: self.user_id,
            recipient_id: self.recipient_id,
            source_currency: self.source_currency,
            target_currency: self.target_currency,
            source_amount: self.source_amount,
            target_amount: self.target_amount,
            exchange_rate: self.exchange_rate,
            remity_fee: self.remity_fee,
            payment_provider_fee: self.payment_provider_fee,
            status: parse_status(&self.status)?,
            estimated_delivery_time: self.estimated_delivery_time,
            onramp_payment_intent_id: self.onramp_payment_intent_id,
            offramp_payout_reference: self.offramp_payout_reference,
            failure_reason: self.failure_reason,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RecipientRow {
    id: Uuid,
    user_id: Uuid,
    full_name: String,
    country_code: String,
    payout: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecipientRow {
    fn into_domain(self) -> StoreResult<Recipient> {
        let payout: PayoutMethod = serde_json::from_value(self.payout)
            .map_err(|e| StoreError::Backend(format!("invalid payout details: {e}")))?;
        Ok(Recipient {
            id: self.id,
            user_id: self.user_id,
            full_name: self.full_name,
            country_code: self.country_code,
            payout,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    full_name: String,
    is_admin: bool,
    kyc_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_domain(self) -> StoreResult<User> {
        Ok(User {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            is_admin: self.is_admin,
            kyc_status: self
                .kyc_status
                .parse()
                .map_err(StoreError::Backend)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LedgerRow {
    id: i64,
    transaction_id: Option<Uuid>,
    event_type: String,
    currency: String,
    amount: BigDecimal,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl LedgerRow {
    fn into_domain(self) -> StoreResult<InternalLedgerEntry> {
        Ok(InternalLedgerEntry {
            id: self.id,
            transaction_id: self.transaction_id,
            event_type: LedgerEventType::from_str(&self.event_type)
                .map_err(StoreError::Backend)?,
            currency: self.currency,
            amount: self.amount,
            description: self.description,
            created_at: self.created_at,
        })
    }
}
