//! Transaction entity.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::TransactionStatus;

/// A remittance transaction. Ownership (user, recipient) and the monetary
/// figures are fixed at creation; everything else moves only through the
/// state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipient_id: Uuid,
    pub source_currency: String,
    pub target_currency: String,
    pub source_amount: BigDecimal,
    pub target_amount: BigDecimal,
    pub exchange_rate: BigDecimal,
    pub remity_fee: BigDecimal,
    pub payment_provider_fee: BigDecimal,
    pub status: TransactionStatus,
    pub estimated_delivery_time: Option<String>,
    pub onramp_payment_intent_id: Option<String>,
    pub offramp_payout_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quote-derived monetary fields carried into a new transaction.
#[derive(Debug, Clone)]
pub struct QuoteFields {
    pub source_currency: String,
    pub target_currency: String,
    pub source_amount: BigDecimal,
    pub target_amount: BigDecimal,
    pub exchange_rate: BigDecimal,
    pub remity_fee: BigDecimal,
    pub payment_provider_fee: BigDecimal,
    pub estimated_delivery_time: Option<String>,
}

impl Transaction {
    /// Builds a new transaction in `QuoteCreated`. The caller is responsible
    /// for having validated the quote fields first.
    pub fn from_quote(user_id: Uuid, recipient_id: Uuid, quote: QuoteFields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            recipient_id,
            source_currency: quote.source_currency,
            target_currency: quote.target_currency,
            source_amount: quote.source_amount,
            target_amount: quote.target_amount,
            exchange_rate: quote.exchange_rate,
            remity_fee: quote.remity_fee,
            payment_provider_fee: quote.payment_provider_fee,
            status: TransactionStatus::QuoteCreated,
            estimated_delivery_time: quote.estimated_delivery_time,
            onramp_payment_intent_id: None,
            offramp_payout_reference: None,
            failure_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
