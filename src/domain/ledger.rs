//! Internal ledger entries.
//!
//! Append-only records of monetary events for reconciliation. Amounts are
//! signed: credit positive, debit negative, from the platform's point of view.
//! Nothing in this crate updates or deletes a ledger row after insertion.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEventType {
    FiatDepositConfirmed,
    FiatPayoutInitiated,
    FiatPayoutConfirmed,
    FeeCollected,
    RefundProcessed,
}

impl LedgerEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FiatDepositConfirmed => "FIAT_DEPOSIT_CONFIRMED",
            Self::FiatPayoutInitiated => "FIAT_PAYOUT_INITIATED",
            Self::FiatPayoutConfirmed => "FIAT_PAYOUT_CONFIRMED",
            Self::FeeCollected => "FEE_COLLECTED",
            Self::RefundProcessed => "REFUND_PROCESSED",
        }
    }
}

impl fmt::Display for LedgerEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIAT_DEPOSIT_CONFIRMED" => Ok(Self::FiatDepositConfirmed),
            "FIAT_PAYOUT_INITIATED" => Ok(Self::FiatPayoutInitiated),
            "FIAT_PAYOUT_CONFIRMED" => Ok(Self::FiatPayoutConfirmed),
            "FEE_COLLECTED" => Ok(Self::FeeCollected),
            "REFUND_PROCESSED" => Ok(Self::RefundProcessed),
            other => Err(format!("unknown ledger event type: {other}")),
        }
    }
}

/// Entry awaiting insertion; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub transaction_id: Option<Uuid>,
    pub event_type: LedgerEventType,
    pub currency: String,
    pub amount: BigDecimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalLedgerEntry {
    pub id: i64,
    pub transaction_id: Option<Uuid>,
    pub event_type: LedgerEventType,
    pub currency: String,
    pub amount: BigDecimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
