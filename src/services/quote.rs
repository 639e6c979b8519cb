//! Quote engine.
//!
//! A quote is a pure function of the request, the live rate, and the fee
//! policy at call time. Nothing here touches storage; quotes are ephemeral and
//! expire after a short TTL.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::money::{to_amount, to_display};
use crate::error::AppError;
use crate::services::fees::FeePolicy;
use crate::services::rates::RateProvider;
use crate::validation::{validate_currency_code, validate_positive_amount};

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    pub source_currency: String,
    pub target_currency: String,
    pub source_amount: Option<BigDecimal>,
    pub target_amount: Option<BigDecimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub quote_id: Uuid,
    pub source_currency: String,
    pub target_currency: String,
    pub source_amount: BigDecimal,
    pub target_amount: BigDecimal,
    pub exchange_rate: BigDecimal,
    pub remity_fee: BigDecimal,
    pub payment_provider_fee: BigDecimal,
    pub total_cost: BigDecimal,
    pub estimated_delivery_time: String,
    pub expires_at: DateTime<Utc>,
}

pub struct QuoteEngine {
    rates: Arc<dyn RateProvider>,
    fees: Arc<dyn FeePolicy>,
    supported_currencies: HashSet<String>,
    quote_ttl: Duration,
}

impl QuoteEngine {
    pub fn new(
        rates: Arc<dyn RateProvider>,
        fees: Arc<dyn FeePolicy>,
        supported_currencies: HashSet<String>,
        quote_ttl_secs: i64,
    ) -> Self {
        Self {
            rates,
            fees,
            supported_currencies,
            quote_ttl: Duration::seconds(quote_ttl_secs),
        }
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote, AppError> {
        let (source_currency, target_currency) = self.validate_currencies(request)?;

        // Exactly one of the two amounts must be present and positive.
        match (&request.source_amount, &request.target_amount) {
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(
                    "provide either source_amount or target_amount, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(AppError::Validation(
                    "either source_amount or target_amount is required".to_string(),
                ))
            }
            (Some(amount), None) => validate_positive_amount("source_amount", amount)?,
            (None, Some(amount)) => validate_positive_amount("target_amount", amount)?,
        }

        let rate = self
            .rates
            .get_rate(&source_currency, &target_currency)
            .await
            .map_err(|e| AppError::RateUnavailable(e.to_string()))?;
        if rate <= BigDecimal::zero() {
            return Err(AppError::Internal(format!(
                "rate provider returned non-positive rate {rate} for {source_currency}->{target_currency}"
            )));
        }

        let (source_amount, target_amount) = match (&request.source_amount, &request.target_amount)
        {
            (Some(source), None) => {
                let source = to_amount(source);
                let target = to_amount(&(&source * &rate));
                (source, target)
            }
            (None, Some(target)) => {
                let target = to_amount(target);
                let source = to_amount(&(&target / &rate));
                (source, target)
            }
            _ => unreachable!("validated above"),
        };

        let fees = self.fees.compute_fees(&source_currency, &source_amount);
        let total_cost =
            to_display(&(&source_amount + &fees.remity_fee + &fees.payment_provider_fee));

        Ok(Quote {
            quote_id: Uuid::new_v4(),
            estimated_delivery_time: delivery_estimate(&target_currency).to_string(),
            source_currency,
            target_currency,
            source_amount,
            target_amount,
            exchange_rate: rate,
            remity_fee: fees.remity_fee,
            payment_provider_fee: fees.payment_provider_fee,
            total_cost,
            expires_at: Utc::now() + self.quote_ttl,
        })
    }

    pub fn is_supported(&self, currency: &str) -> bool {
        self.supported_currencies.contains(currency)
    }

    fn validate_currencies(&self, request: &QuoteRequest) -> Result<(String, String), AppError> {
        validate_currency_code("source_currency", &request.source_currency)?;
        validate_currency_code("target_currency", &request.target_currency)?;

        let source = request.source_currency.trim().to_uppercase();
        let target = request.target_currency.trim().to_uppercase();

        for code in [&source, &target] {
            if !self.supported_currencies.contains(code.as_str()) {
                return Err(AppError::Validation(format!(
                    "currency '{code}' is not supported"
                )));
            }
        }
        Ok((source, target))
    }
}

/// Delivery estimates per payout corridor. A policy table in a fuller build;
/// keyed by target currency for the MVP corridors.
fn delivery_estimate(target_currency: &str) -> &'static str {
    match target_currency {
        "MXN" => "Within minutes (SPEI)",
        "PHP" => "Within 1 hour (GCash)",
        _ => "1-2 business days",
    }
}
