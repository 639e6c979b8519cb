//! Transaction lifecycle service.
//!
//! Every mutation here is a single compare-and-swap through
//! [`TransactionStore::transition`]: the status write, the side-effect fields
//! and any ledger rows land in one atomic commit, or none of them do. Losing a
//! race surfaces as `InvalidStateTransition` naming the status the row
//! actually had.

use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::money::{to_amount, to_display};
use crate::domain::{
    InternalLedgerEntry, LedgerEventType, NewLedgerEntry, QuoteFields, Transaction,
    TransactionEvent, User,
};
use crate::error::AppError;
use crate::ports::{RecipientStore, StoreError, TransactionStore, TransitionChange};
use crate::services::payments::{ChargeRequest, PaymentProvider};
use crate::validation::{
    validate_currency_code, validate_non_negative_amount, validate_positive_amount, REASON_MAX_LEN,
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

/// Quote figures echoed back by the client at creation time, revalidated
/// server-side before any row is written.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionRequest {
    pub recipient_id: Uuid,
    pub source_currency: String,
    pub target_currency: String,
    pub source_amount: BigDecimal,
    pub target_amount: BigDecimal,
    pub exchange_rate: BigDecimal,
    pub remity_fee: BigDecimal,
    pub payment_provider_fee: BigDecimal,
    pub estimated_delivery_time: Option<String>,
}

/// A freshly created transaction plus the processor handle the client needs
/// to collect the payment.
#[derive(Debug, Clone)]
pub struct CreatedTransaction {
    pub transaction: Transaction,
    pub client_secret: String,
}

pub struct TransactionService {
    transactions: Arc<dyn TransactionStore>,
    recipients: Arc<dyn RecipientStore>,
    payments: Arc<dyn PaymentProvider>,
    supported_currencies: HashSet<String>,
}

impl TransactionService {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        recipients: Arc<dyn RecipientStore>,
        payments: Arc<dyn PaymentProvider>,
        supported_currencies: HashSet<String>,
    ) -> Self {
        Self {
            transactions,
            recipients,
            payments,
            supported_currencies,
        }
    }

    /// Creates a transaction from validated quote figures and opens a payment
    /// intent for the total charge. A provider failure marks the row Failed
    /// with the reason; it is never left parked in QuoteCreated.
    pub async fn create(
        &self,
        user: &User,
        request: CreateTransactionRequest,
    ) -> Result<CreatedTransaction, AppError> {
        require_kyc(user)?;

        let recipient = self
            .recipients
            .get_by_owner(request.recipient_id, user.id)
            .await
            .map_err(|e| not_found(e, "recipient"))?;

        let quote = validate_quote_fields(&request)?;
        for code in [&quote.source_currency, &quote.target_currency] {
            if !self.supported_currencies.contains(code.as_str()) {
                return Err(AppError::Validation(format!(
                    "currency '{code}' is not supported"
                )));
            }
        }
        if recipient.payout.payout_currency() != quote.target_currency {
            return Err(AppError::Validation(format!(
                "recipient is paid out in {}, not {}",
                recipient.payout.payout_currency(),
                quote.target_currency
            )));
        }

        let tx = Transaction::from_quote(user.id, recipient.id, quote);
        let tx = self
            .transactions
            .insert(&tx)
            .await
            .map_err(|e| not_found(e, "transaction"))?;

        let total_charge =
            to_display(&(&tx.source_amount + &tx.remity_fee + &tx.payment_provider_fee));
        let intent = match self
            .payments
            .create_intent(&ChargeRequest {
                transaction_id: tx.id,
                amount: total_charge,
                currency: tx.source_currency.clone(),
            })
            .await
        {
            Ok(intent) => intent,
            Err(provider_err) => {
                tracing::warn!(
                    transaction_id = %tx.id,
                    error = %provider_err,
                    "payment intent creation failed, failing transaction"
                );
                if let Err(mark_err) = self
                    .drive(&tx, TransactionEvent::Failed, |change| {
                        change.with_failure_reason(format!(
                            "payment intent creation failed: {provider_err}"
                        ))
                    })
                    .await
                {
                    // The row is still QuoteCreated; leave an operator trail.
                    tracing::error!(
                        transaction_id = %tx.id,
                        error = %mark_err,
                        "could not mark transaction failed after provider error"
                    );
                }
                return Err(AppError::PaymentProvider(provider_err.to_string()));
            }
        };

        let transaction = self
            .drive(&tx, TransactionEvent::PaymentIntentCreated, |change| {
                change.with_payment_intent(intent.intent_id.clone())
            })
            .await?;

        tracing::info!(
            transaction_id = %transaction.id,
            user_id = %user.id,
            source = %transaction.source_currency,
            target = %transaction.target_currency,
            "transaction created, awaiting payment"
        );

        Ok(CreatedTransaction {
            transaction,
            client_secret: intent.client_secret,
        })
    }

    pub async fn get_for_owner(&self, user_id: Uuid, tx_id: Uuid) -> Result<Transaction, AppError> {
        self.transactions
            .get_by_owner(tx_id, user_id)
            .await
            .map_err(|e| not_found(e, "transaction"))
    }

    pub async fn list_for_owner(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Transaction>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        self.transactions
            .list_by_owner(user_id, limit, offset)
            .await
            .map_err(|e| not_found(e, "transaction"))
    }

    pub async fn ledger_for(&self, tx_id: Uuid) -> Result<Vec<InternalLedgerEntry>, AppError> {
        self.transactions
            .ledger_entries(tx_id)
            .await
            .map_err(|e| not_found(e, "transaction"))
    }

    /// Owner-initiated cancellation. Legal only before funds move, which the
    /// state machine enforces.
    pub async fn cancel(&self, user_id: Uuid, tx_id: Uuid) -> Result<Transaction, AppError> {
        let tx = self.get_for_owner(user_id, tx_id).await?;
        self.drive(&tx, TransactionEvent::Cancelled, |change| change)
            .await
    }

    /// Webhook: the processor settled the charge. Appends the deposit and fee
    /// ledger rows in the same commit as the status change; a replayed webhook
    /// finds the row past PendingPayment and gets a state conflict, so no
    /// duplicate ledger rows are possible.
    pub async fn on_payment_confirmed(&self, intent_id: &str) -> Result<Transaction, AppError> {
        let tx = self
            .transactions
            .get_by_payment_intent(intent_id)
            .await
            .map_err(|e| not_found(e, "transaction"))?;

        let updated = self
            .drive(&tx, TransactionEvent::PaymentConfirmed, |change| {
                change
                    .with_ledger_entry(NewLedgerEntry {
                        transaction_id: Some(tx.id),
                        event_type: LedgerEventType::FiatDepositConfirmed,
                        currency: tx.source_currency.clone(),
                        amount: tx.source_amount.clone(),
                        description: Some(format!("deposit for intent {intent_id}")),
                    })
                    .with_ledger_entry(NewLedgerEntry {
                        transaction_id: Some(tx.id),
                        event_type: LedgerEventType::FeeCollected,
                        currency: tx.source_currency.clone(),
                        amount: tx.remity_fee.clone(),
                        description: None,
                    })
            })
            .await?;

        tracing::info!(transaction_id = %updated.id, "payment confirmed, queued for review");
        Ok(updated)
    }

    /// Webhook: the processor reported the charge as failed.
    pub async fn on_payment_failed(
        &self,
        intent_id: &str,
        reason: Option<&str>,
    ) -> Result<Transaction, AppError> {
        let tx = self
            .transactions
            .get_by_payment_intent(intent_id)
            .await
            .map_err(|e| not_found(e, "transaction"))?;

        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or("payment failed at provider");
        let updated = self
            .drive(&tx, TransactionEvent::Failed, |change| {
                change.with_failure_reason(truncate_reason(reason))
            })
            .await?;

        tracing::warn!(
            transaction_id = %updated.id,
            reason,
            "payment failed"
        );
        Ok(updated)
    }

    /// Ops: the payout was handed to the offramp partner.
    pub async fn mark_payout_initiated(
        &self,
        tx_id: Uuid,
        reference: &str,
    ) -> Result<Transaction, AppError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::Validation(
                "payout reference must not be blank".to_string(),
            ));
        }

        let tx = self.get(tx_id).await?;
        self.drive(&tx, TransactionEvent::PayoutInitiated, |change| {
            change
                .with_payout_reference(reference)
                .with_ledger_entry(NewLedgerEntry {
                    transaction_id: Some(tx.id),
                    event_type: LedgerEventType::FiatPayoutInitiated,
                    currency: tx.target_currency.clone(),
                    amount: -tx.target_amount.clone(),
                    description: Some(format!("payout via {reference}")),
                })
        })
        .await
    }

    /// Ops: the offramp partner confirmed settlement.
    pub async fn mark_payout_completed(&self, tx_id: Uuid) -> Result<Transaction, AppError> {
        let tx = self.get(tx_id).await?;
        self.drive(&tx, TransactionEvent::PayoutConfirmed, |change| {
            change.with_ledger_entry(NewLedgerEntry {
                transaction_id: Some(tx.id),
                event_type: LedgerEventType::FiatPayoutConfirmed,
                currency: tx.target_currency.clone(),
                amount: -tx.target_amount.clone(),
                description: None,
            })
        })
        .await
    }

    pub async fn confirm_delivery(&self, tx_id: Uuid) -> Result<Transaction, AppError> {
        let tx = self.get(tx_id).await?;
        self.drive(&tx, TransactionEvent::DeliveryConfirmed, |change| change)
            .await
    }

    /// Ops: the sender was refunded after a failure or rejection.
    pub async fn confirm_refund(&self, tx_id: Uuid) -> Result<Transaction, AppError> {
        let tx = self.get(tx_id).await?;
        self.drive(&tx, TransactionEvent::RefundConfirmed, |change| {
            change.with_ledger_entry(NewLedgerEntry {
                transaction_id: Some(tx.id),
                event_type: LedgerEventType::RefundProcessed,
                currency: tx.source_currency.clone(),
                amount: -tx.source_amount.clone(),
                description: None,
            })
        })
        .await
    }

    async fn get(&self, tx_id: Uuid) -> Result<Transaction, AppError> {
        self.transactions
            .get(tx_id)
            .await
            .map_err(|e| not_found(e, "transaction"))
    }

    /// Applies one state-machine event through the store's compare-and-swap.
    /// The event is checked against the status read here; if another writer
    /// moved the row in between, the store reports the status it saw and the
    /// caller gets a 409 naming it.
    async fn drive<F>(
        &self,
        tx: &Transaction,
        event: TransactionEvent,
        build: F,
    ) -> Result<Transaction, AppError>
    where
        F: FnOnce(TransitionChange) -> TransitionChange,
    {
        let next = tx.status.apply(event)?;
        let change = build(TransitionChange::to(next));
        match self.transactions.transition(tx.id, tx.status, change).await {
            Ok(updated) => Ok(updated),
            Err(StoreError::StatusConflict { current }) => {
                Err(AppError::InvalidStateTransition { current, event })
            }
            Err(other) => Err(not_found(other, "transaction")),
        }
    }
}

fn require_kyc(user: &User) -> Result<(), AppError> {
    if user.is_kyc_verified() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "identity verification is required before sending money".to_string(),
        ))
    }
}

/// Revalidates client-echoed quote figures. Currencies must be well-formed,
/// amounts positive, fees non-negative, and the target must equal the source
/// converted at the quoted rate (half-up, 8 dp).
fn validate_quote_fields(request: &CreateTransactionRequest) -> Result<QuoteFields, AppError> {
    validate_currency_code("source_currency", &request.source_currency)?;
    validate_currency_code("target_currency", &request.target_currency)?;
    validate_positive_amount("source_amount", &request.source_amount)?;
    validate_positive_amount("target_amount", &request.target_amount)?;

    if request.exchange_rate <= BigDecimal::zero() {
        return Err(AppError::Validation(
            "exchange_rate must be positive".to_string(),
        ));
    }
    validate_non_negative_amount("remity_fee", &request.remity_fee)?;
    validate_non_negative_amount("payment_provider_fee", &request.payment_provider_fee)?;

    let source_amount = to_amount(&request.source_amount);
    let expected_target = to_amount(&(&source_amount * &request.exchange_rate));
    let target_amount = to_amount(&request.target_amount);
    if target_amount != expected_target {
        return Err(AppError::Validation(format!(
            "target_amount {} does not match source_amount at rate {} (expected {})",
            target_amount, request.exchange_rate, expected_target
        )));
    }

    Ok(QuoteFields {
        source_currency: request.source_currency.trim().to_uppercase(),
        target_currency: request.target_currency.trim().to_uppercase(),
        source_amount,
        target_amount,
        exchange_rate: request.exchange_rate.clone(),
        remity_fee: to_display(&request.remity_fee),
        payment_provider_fee: to_display(&request.payment_provider_fee),
        estimated_delivery_time: request.estimated_delivery_time.clone(),
    })
}

fn truncate_reason(reason: &str) -> String {
    let trimmed = reason.trim();
    if trimmed.len() <= REASON_MAX_LEN {
        trimmed.to_string()
    } else {
        trimmed.chars().take(REASON_MAX_LEN).collect()
    }
}

fn not_found(err: StoreError, entity: &str) -> AppError {
    match err {
        StoreError::NotFound => AppError::NotFound(format!("{entity} not found")),
        StoreError::StatusConflict { current } => {
            AppError::Internal(format!("unexpected status conflict: {current}"))
        }
        StoreError::Backend(msg) => AppError::Internal(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn request() -> CreateTransactionRequest {
        CreateTransactionRequest {
            recipient_id: Uuid::new_v4(),
            source_currency: "USD".into(),
            target_currency: "MXN".into(),
            source_amount: dec("100.00000000"),
            target_amount: dec("1985.00000000"),
            exchange_rate: dec("19.85"),
            remity_fee: dec("1.00"),
            payment_provider_fee: dec("3.20"),
            estimated_delivery_time: None,
        }
    }

    #[test]
    fn accepts_consistent_quote_fields() {
        let quote = validate_quote_fields(&request()).unwrap();
        assert_eq!(quote.target_amount, dec("1985.00000000"));
    }

    #[test]
    fn rejects_target_not_matching_rate() {
        let mut req = request();
        req.target_amount = dec("2000.00000000");
        assert!(matches!(
            validate_quote_fields(&req),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_non_positive_rate() {
        let mut req = request();
        req.exchange_rate = dec("0");
        assert!(matches!(
            validate_quote_fields(&req),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rejects_negative_fees() {
        let mut req = request();
        req.remity_fee = dec("-1.00");
        assert!(matches!(
            validate_quote_fields(&req),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn long_failure_reasons_are_truncated() {
        let reason = "x".repeat(REASON_MAX_LEN + 50);
        assert_eq!(truncate_reason(&reason).len(), REASON_MAX_LEN);
    }
}
